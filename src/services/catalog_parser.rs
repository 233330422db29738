/// 课表解析
///
/// 把查询接口返回的 class_list HTML 片段解析成课程列表。
/// 片段可能为空或残缺，这里只做宽松提取，缺什么就给默认值，从不报错。
use scraper::{Html, Selector};

use crate::models::{Course, CourseStatus};

/// 从课表 HTML 片段解析课程列表
///
/// 保持文档顺序；缺少订单链接的条目直接跳过
pub fn parse_courses_from_html(html_ul: &str) -> Vec<Course> {
    let document = Html::parse_fragment(html_ul);
    let li_sel = Selector::parse("ul.course_list > li").unwrap();
    let link_sel = Selector::parse("a.course_link").unwrap();
    let name_sel = Selector::parse(".course_detail .name").unwrap();
    let date_sel = Selector::parse(".course_detail .date b").unwrap();
    let thumbs_sel = Selector::parse(".course_thumbs span").unwrap();
    let status_sel = Selector::parse(".book_status i.course_status").unwrap();

    let mut courses = Vec::new();
    for li in document.select(&li_sel) {
        let Some(link) = li.select(&link_sel).next() else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or("").to_string();

        let title = li
            .select(&name_sel)
            .next()
            .map(|node| collect_text(&node))
            .unwrap_or_default();
        let time = li
            .select(&date_sel)
            .next()
            .map(|node| collect_text(&node))
            .unwrap_or_default();

        let (taken, total) = li
            .select(&thumbs_sel)
            .next()
            .map(|node| parse_occupancy(&collect_text(&node)))
            .unwrap_or((0, 0));

        let status = li
            .select(&status_sel)
            .next()
            .map(|node| {
                let classes: Vec<&str> = node.value().classes().collect();
                CourseStatus::from_class_attr(&classes.join(" "))
            })
            .unwrap_or(CourseStatus::Unknown);

        courses.push(Course {
            title,
            time,
            taken,
            total,
            status,
            href,
        });
    }
    courses
}

fn collect_text(node: &scraper::ElementRef<'_>) -> String {
    node.text().collect::<String>().trim().to_string()
}

/// 解析 "已报/总数" 形式的占用串，解析失败时双零
fn parse_occupancy(text: &str) -> (u32, u32) {
    let Some((taken, total)) = text.trim().split_once('/') else {
        return (0, 0);
    };
    match (taken.trim().parse(), total.trim().parse()) {
        (Ok(taken), Ok(total)) => (taken, total),
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <ul class="course_list">
          <li>
            <a class="course_link" href="/m/e74abd6e/course/order?id=8225475"></a>
            <div class="course_detail">
              <p class="name">动感单车</p>
              <p class="date"><b>12:00-13:00</b></p>
            </div>
            <div class="course_thumbs"><span>18/30</span></div>
            <div class="book_status"><i class="course_status available"></i></div>
          </li>
          <li>
            <a class="course_link" href="/m/e74abd6e/course/order?id=8225476"></a>
            <div class="course_detail">
              <p class="name">瑜伽</p>
              <p class="date"><b>19:00-20:00</b></p>
            </div>
            <div class="course_thumbs"><span>30/30</span></div>
            <div class="book_status"><i class="course_status full"></i></div>
          </li>
        </ul>
    "#;

    #[test]
    fn test_parse_sample() {
        let courses = parse_courses_from_html(SAMPLE);
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].title, "动感单车");
        assert_eq!(courses[0].time, "12:00-13:00");
        assert_eq!(courses[0].taken, 18);
        assert_eq!(courses[0].total, 30);
        assert_eq!(courses[0].status, CourseStatus::Available);
        assert_eq!(courses[1].status, CourseStatus::Full);
    }

    #[test]
    fn test_empty_fragment() {
        assert!(parse_courses_from_html("").is_empty());
        assert!(parse_courses_from_html("<ul class=\"course_list\"></ul>").is_empty());
    }

    #[test]
    fn test_malformed_fragment_never_panics() {
        let courses = parse_courses_from_html("<ul class='course_list'><li><div>残缺");
        // 没有 course_link 的条目被跳过
        assert!(courses.is_empty());
    }

    #[test]
    fn test_missing_pieces_get_defaults() {
        let html = r#"
            <ul class="course_list">
              <li><a class="course_link" href="/order?id=1"></a></li>
            </ul>
        "#;
        let courses = parse_courses_from_html(html);
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].title, "");
        assert_eq!(courses[0].taken, 0);
        assert_eq!(courses[0].total, 0);
        assert_eq!(courses[0].status, CourseStatus::Unknown);
    }

    #[test]
    fn test_bad_occupancy_defaults_to_zero() {
        assert_eq!(parse_occupancy("abc/def"), (0, 0));
        assert_eq!(parse_occupancy("满员"), (0, 0));
        assert_eq!(parse_occupancy(" 7 / 20 "), (7, 20));
    }
}
