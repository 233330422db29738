/// 订单页字段收集
///
/// 提交确认请求所需的表单字段全部埋在订单页里：隐藏 input、带默认选项的
/// select，偶尔 course_id 只出现在内联脚本里，需要正则兜底。
use std::collections::HashMap;

use regex::Regex;
use scraper::{Html, Selector};

/// 提取订单页里的表单字段
///
/// - 隐藏 input 直接取 name → value
/// - 有 name 的 select 取选中项（或第一项）的 value 作为缺省值，不覆盖已有字段
/// - 补齐 note / quantity / is_waiting 的默认值
pub fn extract_hidden_fields(order_html: &str) -> HashMap<String, String> {
    let document = Html::parse_document(order_html);
    let hidden_sel = Selector::parse(r#"input[type="hidden"][name]"#).unwrap();
    let select_sel = Selector::parse("select[name]").unwrap();
    let selected_opt_sel = Selector::parse("option[selected]").unwrap();
    let any_opt_sel = Selector::parse("option").unwrap();

    let mut fields = HashMap::new();
    for input in document.select(&hidden_sel) {
        let Some(name) = input.value().attr("name") else {
            continue;
        };
        let value = input.value().attr("value").unwrap_or("");
        fields.insert(name.to_string(), value.to_string());
    }

    for select in document.select(&select_sel) {
        let Some(name) = select.value().attr("name") else {
            continue;
        };
        let option = select
            .select(&selected_opt_sel)
            .next()
            .or_else(|| select.select(&any_opt_sel).next());
        if let Some(option) = option {
            let value = option.value().attr("value").unwrap_or("");
            fields.entry(name.to_string()).or_insert_with(|| value.to_string());
        }
    }

    fields.entry("note".to_string()).or_default();
    fields.entry("quantity".to_string()).or_insert_with(|| "1".to_string());
    fields.entry("is_waiting".to_string()).or_default();
    fields
}

/// course_id 兜底恢复
///
/// 字段缺失时依次尝试：带 name 属性的标准写法、页面任意位置的宽松写法、
/// 调用方提供的默认值；先命中者生效。
pub fn recover_course_id(
    fields: &mut HashMap<String, String>,
    order_html: &str,
    default_course_id: Option<&str>,
) {
    if fields.get("course_id").is_some_and(|v| !v.is_empty()) {
        return;
    }

    let patterns = [
        r#"name="course_id"\s+value="(\d+)""#,
        r#"course_id"?\s*[:=]\s*"?(\d+)"#,
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(captures) = re.captures(order_html) {
            fields.insert("course_id".to_string(), captures[1].to_string());
            return;
        }
    }

    if let Some(default_id) = default_course_id {
        if !default_id.is_empty() {
            fields.insert("course_id".to_string(), default_id.to_string());
        }
    }
}
