/// 选课策略
///
/// 在可约课程里按关键字优先级 + 占用率挑一节；挑不出时区分
/// "查询结果为空"（NO_MATCH）和 "有课但都不可约"（COURSE_FULL）。
use std::cmp::Ordering;

use crate::models::{Course, Reason};

/// 关键字没有命中时的序号哨兵，保证排在所有命中项之后
const NO_MATCH_RANK: usize = 999;

/// 选课失败原因（交给流水线转成 RunOutcome）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectFailure {
    /// 没有任何候选课
    NoMatch,
    /// 有课但全部不可预约
    CourseFull,
}

impl SelectFailure {
    pub fn reason(self) -> Reason {
        match self {
            SelectFailure::NoMatch => Reason::NoMatch,
            SelectFailure::CourseFull => Reason::CourseFull,
        }
    }
}

/// 关键字列表为空时视为全部命中
fn keyword_match(value: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    keywords.iter().any(|kw| !kw.is_empty() && value.contains(kw.as_str()))
}

/// 第一个命中关键字的序号，没命中返回哨兵
fn keyword_rank(value: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .position(|kw| !kw.is_empty() && value.contains(kw.as_str()))
        .unwrap_or(NO_MATCH_RANK)
}

/// 排序键：(标题关键字序号, 时段关键字序号, 占用率)
fn score_course(course: &Course, title_keywords: &[String], time_keywords: &[String]) -> (usize, usize, f64) {
    (
        keyword_rank(&course.title, title_keywords),
        keyword_rank(&course.time, time_keywords),
        course.occupancy_ratio(),
    )
}

/// 从解析结果中选出一节课
///
/// - `strict_match` 为 true 时只接受关键字全中的课；
///   配合 `allow_fallback` 可在严格池为空时退回全部可约课
/// - 排序稳定，同分保持文档顺序
pub fn select_course<'a>(
    courses: &'a [Course],
    title_keywords: &[String],
    time_keywords: &[String],
    strict_match: bool,
    allow_fallback: bool,
) -> Result<&'a Course, SelectFailure> {
    let available: Vec<&Course> = courses.iter().filter(|c| c.status.is_bookable()).collect();
    if available.is_empty() {
        if courses.is_empty() {
            return Err(SelectFailure::NoMatch);
        }
        return Err(SelectFailure::CourseFull);
    }

    let strict_pool: Vec<&Course> = available
        .iter()
        .copied()
        .filter(|c| keyword_match(&c.title, title_keywords) && keyword_match(&c.time, time_keywords))
        .collect();

    let mut candidates = if strict_match {
        if !strict_pool.is_empty() {
            strict_pool
        } else if allow_fallback {
            available
        } else {
            return Err(SelectFailure::NoMatch);
        }
    } else if !strict_pool.is_empty() {
        strict_pool
    } else {
        available
    };

    // sort_by 是稳定排序，分数相同的课保持原有顺序
    candidates.sort_by(|a, b| {
        let sa = score_course(a, title_keywords, time_keywords);
        let sb = score_course(b, title_keywords, time_keywords);
        sa.partial_cmp(&sb).unwrap_or(Ordering::Equal)
    });
    Ok(candidates[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseStatus;

    fn course(title: &str, time: &str, taken: u32, total: u32, status: CourseStatus) -> Course {
        Course {
            title: title.to_string(),
            time: time.to_string(),
            taken,
            total,
            status,
            href: format!("/order?id={}", title.len()),
        }
    }

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_empty_input_is_no_match() {
        let result = select_course(&[], &[], &[], true, true);
        assert_eq!(result.unwrap_err(), SelectFailure::NoMatch);
    }

    #[test]
    fn test_all_full_is_course_full() {
        let courses = vec![course("瑜伽", "12:00", 30, 30, CourseStatus::Full)];
        let result = select_course(&courses, &[], &[], true, true);
        assert_eq!(result.unwrap_err(), SelectFailure::CourseFull);
    }

    #[test]
    fn test_strict_without_fallback_is_no_match() {
        let courses = vec![course("动感单车", "12:00", 1, 30, CourseStatus::Available)];
        let result = select_course(&courses, &kw(&["瑜伽"]), &[], true, false);
        assert_eq!(result.unwrap_err(), SelectFailure::NoMatch);
    }

    #[test]
    fn test_strict_with_fallback_takes_available() {
        let courses = vec![course("动感单车", "12:00", 1, 30, CourseStatus::Available)];
        let selected = select_course(&courses, &kw(&["瑜伽"]), &[], true, true).unwrap();
        assert_eq!(selected.title, "动感单车");
    }

    #[test]
    fn test_keyword_priority_beats_document_order() {
        let courses = vec![
            course("普拉提", "12:00", 1, 30, CourseStatus::Available),
            course("瑜伽", "12:00", 1, 30, CourseStatus::Available),
        ];
        // 瑜伽排在关键字列表第一位，尽管文档顺序靠后仍应被选中
        let selected = select_course(&courses, &kw(&["瑜伽", "普拉提"]), &[], true, true).unwrap();
        assert_eq!(selected.title, "瑜伽");
    }

    #[test]
    fn test_time_keyword_breaks_title_tie() {
        let courses = vec![
            course("瑜伽", "19:00-20:00", 1, 30, CourseStatus::Available),
            course("瑜伽", "12:00-13:00", 1, 30, CourseStatus::Available),
        ];
        let selected =
            select_course(&courses, &kw(&["瑜伽"]), &kw(&["12:00"]), true, true).unwrap();
        assert_eq!(selected.time, "12:00-13:00");
    }

    #[test]
    fn test_unknown_total_sorts_last() {
        let courses = vec![
            course("瑜伽A", "12:00", 0, 0, CourseStatus::Available),
            course("瑜伽B", "12:00", 29, 30, CourseStatus::Available),
        ];
        // total==0 的课按占用率 1.0 处理，排在 29/30 之后
        let selected = select_course(&courses, &kw(&["瑜伽"]), &[], true, true).unwrap();
        assert_eq!(selected.title, "瑜伽B");
        assert_eq!(courses[0].occupancy_ratio(), 1.0);
    }

    #[test]
    fn test_stable_order_on_equal_score() {
        let courses = vec![
            course("瑜伽A", "12:00", 5, 30, CourseStatus::Available),
            course("瑜伽B", "12:00", 5, 30, CourseStatus::Available),
        ];
        let selected = select_course(&courses, &[], &[], false, true).unwrap();
        assert_eq!(selected.title, "瑜伽A");
    }

    #[test]
    fn test_select_is_deterministic() {
        let courses = vec![
            course("普拉提", "12:00", 10, 30, CourseStatus::Hot),
            course("瑜伽", "19:00", 5, 30, CourseStatus::Available),
        ];
        let first = select_course(&courses, &kw(&["瑜伽"]), &[], true, true).unwrap().title.clone();
        let second = select_course(&courses, &kw(&["瑜伽"]), &[], true, true).unwrap().title.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_queue_status_is_bookable() {
        let courses = vec![course("瑜伽", "12:00", 30, 30, CourseStatus::Queue)];
        assert!(select_course(&courses, &[], &[], true, true).is_ok());
    }
}
