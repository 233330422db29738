//! 预约流程 - 流程层
//!
//! 核心职责：定义"一次预约尝试"的完整流程
//!
//! 流程顺序：
//! 1. 查询课表 → 解析 → 选课
//! 2. 拉订单页 → 收集表单字段 → 解析会员卡
//! 3. 提交确认 → 按响应归因
//!
//! 任何一步失败都产出一个填充完整的 `RunOutcome`，业务失败从不向上抛错。

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::clients::{norm_url, PageResponse, SiteClient};
use crate::models::{CourseSummary, Reason, RunOutcome, RunRequest};
use crate::services::{
    extract_hidden_fields, parse_cards_from_html, parse_courses_from_html, pick_card_by_keywords,
    recover_course_id, select_course, SignalClassifier,
};
use crate::utils::truncate_text;

/// 确认响应归因结果
#[derive(Debug)]
struct ConfirmAssessment {
    success: bool,
    reason: Reason,
    code: Option<i64>,
    msg: Option<String>,
    req_id: Option<String>,
    evidence: String,
}

/// 预约流程
///
/// 持有文案分类器，本身无状态，可按尝试创建
pub struct BookingFlow {
    classifier: SignalClassifier,
}

impl Default for BookingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingFlow {
    pub fn new() -> Self {
        Self {
            classifier: SignalClassifier::default(),
        }
    }

    /// 使用自定义分类器（站点文案改版或测试时）
    pub fn with_classifier(classifier: SignalClassifier) -> Self {
        Self { classifier }
    }

    /// 执行一次完整的预约尝试
    pub async fn run_once(&self, request: &RunRequest) -> RunOutcome {
        let client = match SiteClient::new(&request.cookie) {
            Ok(client) => client,
            Err(err) => {
                return RunOutcome::failure(
                    Reason::Unknown,
                    err.to_string(),
                    format!("会话创建失败: {}", err),
                )
            }
        };

        // ========== 步骤 1: 查询课表 ==========
        let search_data = match client.fetch_search(&request.date, &request.shop_id, "1").await {
            Ok(data) => data,
            Err(err) => return self.search_error_outcome(err),
        };

        // ========== 步骤 2: 空课表判定 ==========
        let class_list = match self.classify_search_data(&search_data) {
            Ok(html) => html,
            Err(outcome) => return outcome,
        };

        // ========== 步骤 3: 解析 + 选课 ==========
        let courses = parse_courses_from_html(&class_list);
        let selected = match select_course(
            &courses,
            &request.title_keywords,
            &request.time_keywords,
            request.strict_match,
            request.allow_fallback,
        ) {
            Ok(course) => course.clone(),
            Err(failure) => {
                let reason = failure.reason();
                let msg = if reason == Reason::NoMatch {
                    "课程未匹配"
                } else {
                    "目标课程不可预约"
                };
                return RunOutcome {
                    code: search_data.get("code").and_then(Value::as_i64),
                    ..RunOutcome::failure(
                        reason,
                        msg,
                        format!(
                            "选课失败: reason={} strict={} allow_fallback={}",
                            reason.as_str(),
                            request.strict_match,
                            request.allow_fallback
                        ),
                    )
                };
            }
        };

        let order_url = norm_url(client.base_url(), &selected.href);
        let class_id = extract_query_id(&order_url);
        let summary = CourseSummary {
            title: selected.title.clone(),
            time: selected.time.clone(),
            href: order_url.clone(),
        };
        debug!(
            "选中课程: {} {} [{}] -> {}",
            summary.title,
            summary.time,
            selected.status.as_str(),
            order_url
        );

        // ========== 步骤 4: 拉取订单页 ==========
        let order_page = match client.get_page(&order_url, &client.default_referer()).await {
            Ok(page) => page,
            Err(err) => {
                return RunOutcome {
                    course: Some(summary),
                    ..RunOutcome::failure(
                        Reason::Unknown,
                        "订单页拉取失败",
                        format!("订单页请求异常: {}", err),
                    )
                }
            }
        };
        if let Err(outcome) = self.check_order_page(&order_page, &summary) {
            return outcome;
        }

        // ========== 步骤 5: 收集表单字段 ==========
        let mut fields = extract_hidden_fields(&order_page.body);
        if let Some(class_id) = class_id {
            fields.entry("class_id".to_string()).or_insert(class_id);
        }
        recover_course_id(&mut fields, &order_page.body, request.default_course_id.as_deref());
        if !field_present(&fields, "course_id") {
            return RunOutcome {
                http_status: Some(order_page.status),
                course: Some(summary),
                final_url: Some(order_page.final_url),
                ..RunOutcome::failure(
                    Reason::CourseIdMissing,
                    "未解析到 course_id",
                    "订单页缺少 course_id 字段",
                )
            };
        }

        // ========== 步骤 6: 解析会员卡 ==========
        if !field_present(&fields, "member_card_id") || !field_present(&fields, "card_cat_id") {
            let (cards, fetch_err) = match client.fetch_card_page().await {
                Ok(page) => (parse_cards_from_html(&page.body), String::new()),
                Err(err) => (Vec::new(), err.to_string()),
            };
            if let Some(card) = pick_card_by_keywords(&cards, &request.preferred_card_keywords) {
                fields
                    .entry("member_card_id".to_string())
                    .or_insert_with(|| card.member_card_id.clone());
                fields
                    .entry("card_cat_id".to_string())
                    .or_insert_with(|| card.card_cat_id.clone());
            } else if let (Some(mc), Some(cc)) = (
                request.default_member_card_id.as_deref(),
                request.default_card_cat_id.as_deref(),
            ) {
                fields
                    .entry("member_card_id".to_string())
                    .or_insert_with(|| mc.to_string());
                fields
                    .entry("card_cat_id".to_string())
                    .or_insert_with(|| cc.to_string());
            } else {
                return RunOutcome {
                    http_status: Some(order_page.status),
                    course: Some(summary),
                    final_url: Some(order_page.final_url),
                    ..RunOutcome::failure(
                        Reason::CardMissing,
                        if fetch_err.is_empty() {
                            "未找到可用卡".to_string()
                        } else {
                            fetch_err
                        },
                        "未能解析到 member_card_id/card_cat_id",
                    )
                };
            }
        }
        if !field_present(&fields, "member_card_id") || !field_present(&fields, "card_cat_id") {
            return RunOutcome {
                http_status: Some(order_page.status),
                course: Some(summary),
                final_url: Some(order_page.final_url),
                ..RunOutcome::failure(Reason::CardMissing, "缺少卡信息", "提交订单所需卡信息缺失")
            };
        }

        fields.entry("time_from_stamp".to_string()).or_insert_with(|| "0".to_string());
        fields.entry("time_to_stamp".to_string()).or_insert_with(|| "0".to_string());
        fields.entry("quantity".to_string()).or_insert_with(|| "1".to_string());
        fields.entry("is_waiting".to_string()).or_default();

        // ========== 步骤 7: 提交确认 ==========
        let confirm = match client
            .post_order_confirm(&order_url, &fields, &self.classifier)
            .await
        {
            Ok(page) => page,
            Err(err) => {
                return RunOutcome {
                    course: Some(summary),
                    ..RunOutcome::failure(
                        Reason::Unknown,
                        "订单确认请求失败",
                        format!("order_confirm 请求异常: {}", err),
                    )
                }
            }
        };

        // ========== 步骤 8: 结果归因 ==========
        let assessment = self.assess_confirm(&confirm);
        RunOutcome {
            success: assessment.success,
            reason: assessment.reason,
            http_status: Some(confirm.status),
            code: assessment.code,
            msg: assessment.msg,
            req_id: assessment.req_id,
            course: Some(summary),
            final_url: Some(confirm.final_url.clone()),
            evidence: Some(assessment.evidence),
            raw_response: Some(truncate_text(&confirm.body, 300)),
            retry_recommended: assessment.reason == Reason::RateLimit,
        }
    }

    /// 查询请求失败的归因：401/403 → Cookie 失效，429 → 风控
    fn search_error_outcome(&self, err: anyhow::Error) -> RunOutcome {
        let status = err
            .downcast_ref::<reqwest::Error>()
            .and_then(|e| e.status())
            .map(|s| s.as_u16());
        let reason = match status {
            Some(401) | Some(403) => Reason::CookieInvalid,
            Some(429) => Reason::RateLimit,
            _ => Reason::Unknown,
        };
        RunOutcome {
            http_status: status,
            ..RunOutcome::failure(
                reason,
                err.to_string(),
                format!("search HTTP error: status={:?} err={}", status, err),
            )
        }
    }

    /// 空课表判定
    ///
    /// class_list 为空时大概率是 Cookie 失效；消息带繁忙文案时按风控处理
    fn classify_search_data(&self, data: &Value) -> Result<String, RunOutcome> {
        let class_list = data
            .get("data")
            .and_then(|d| d.get("class_list"))
            .and_then(Value::as_str)
            .unwrap_or("");
        if !class_list.trim().is_empty() {
            return Ok(class_list.to_string());
        }
        let msg = data.get("msg").and_then(Value::as_str).unwrap_or("");
        let reason = if self.classifier.is_busy(msg) {
            Reason::RateLimit
        } else {
            Reason::CookieInvalid
        };
        Err(RunOutcome {
            code: data.get("code").and_then(Value::as_i64),
            ..RunOutcome::failure(
                reason,
                msg,
                format!("search data missing class_list msg={}", msg),
            )
        })
    }

    /// 订单页健康检查：状态码、登录重定向、登录文案
    fn check_order_page(&self, page: &PageResponse, summary: &CourseSummary) -> Result<(), RunOutcome> {
        if page.status != 200 {
            return Err(RunOutcome {
                http_status: Some(page.status),
                course: Some(summary.clone()),
                final_url: Some(page.final_url.clone()),
                ..RunOutcome::failure(
                    Reason::Unknown,
                    "订单页拉取失败",
                    format!("订单页返回状态码 {}", page.status),
                )
            });
        }
        if self.classifier.is_login_redirect(&page.final_url) {
            return Err(RunOutcome {
                http_status: Some(page.status),
                course: Some(summary.clone()),
                final_url: Some(page.final_url.clone()),
                ..RunOutcome::failure(
                    Reason::CookieInvalid,
                    "订单页重定向至登录",
                    format!("订单页被重定向到 {}", page.final_url),
                )
            });
        }
        if self.classifier.is_login_prompt(&page.body) {
            return Err(RunOutcome {
                http_status: Some(page.status),
                course: Some(summary.clone()),
                final_url: Some(page.final_url.clone()),
                ..RunOutcome::failure(
                    Reason::CookieInvalid,
                    "页面提示需要登录",
                    format!("订单页提示登录: {}", truncate_text(&page.body, 120)),
                )
            });
        }
        Ok(())
    }

    /// 确认响应归因
    ///
    /// 成功判定三选一：JSON code==200、msg 带成功文案、响应体带成功文案
    fn assess_confirm(&self, confirm: &PageResponse) -> ConfirmAssessment {
        let text_head = truncate_text(&confirm.body, 300);
        let data = serde_json::from_str::<Value>(&confirm.body).ok();

        let mut code = None;
        let mut msg = None;
        let mut req_id = None;
        if let Some(data) = data.as_ref().filter(|v| v.is_object()) {
            code = data.get("code").and_then(Value::as_i64);
            msg = data.get("msg").and_then(Value::as_str).map(str::to_string);
            req_id = data.get("req_id").and_then(Value::as_str).map(str::to_string);
        } else {
            msg = Some(text_head.clone());
        }

        let mut success = code == Some(200);
        if !success {
            if let Some(msg) = msg.as_deref() {
                success = self.classifier.is_success(msg);
            }
        }
        if !success {
            success = self.classifier.is_success(&confirm.body);
        }

        let (reason, evidence) = if success {
            (
                Reason::Ok,
                format!("order_confirm成功: code={:?} msg={:?}", code, msg),
            )
        } else {
            (
                self.classifier.failure_reason(&confirm.final_url, &confirm.body),
                format!(
                    "order_confirm返回: code={:?} msg={}",
                    code,
                    msg.as_deref().unwrap_or(&text_head)
                ),
            )
        };

        ConfirmAssessment {
            success,
            reason,
            code,
            msg,
            req_id,
            evidence,
        }
    }
}

fn field_present(fields: &std::collections::HashMap<String, String>, key: &str) -> bool {
    fields.get(key).is_some_and(|v| !v.is_empty())
}

/// 从订单 URL 的 id 查询参数里取数字课次 ID
fn extract_query_id(url: &str) -> Option<String> {
    let re = Regex::new(r"[?&]id=(\d+)").unwrap();
    re.captures(url).map(|c| c[1].to_string())
}
