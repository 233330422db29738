use serde::Serialize;

/// 结果原因码（闭集）
///
/// 业务失败一律落到这里，不以 Err 形式向上抛
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reason {
    /// 预约成功
    #[serde(rename = "OK")]
    Ok,
    /// Cookie 失效或未登录
    #[serde(rename = "COOKIE_INVALID")]
    CookieInvalid,
    /// 系统繁忙/被风控，建议重试
    #[serde(rename = "RATE_LIMIT")]
    RateLimit,
    /// 没有匹配到课程
    #[serde(rename = "NO_MATCH")]
    NoMatch,
    /// 有课但都不可约
    #[serde(rename = "COURSE_FULL")]
    CourseFull,
    /// 订单页拿不到 course_id
    #[serde(rename = "COURSE_ID_MISSING")]
    CourseIdMissing,
    /// 缺少会员卡信息
    #[serde(rename = "CARD_MISSING")]
    CardMissing,
    /// 提交后被重定向到登录
    #[serde(rename = "REDIRECT_LOGIN")]
    RedirectLogin,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Default for Reason {
    fn default() -> Self {
        Reason::Unknown
    }
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Ok => "OK",
            Reason::CookieInvalid => "COOKIE_INVALID",
            Reason::RateLimit => "RATE_LIMIT",
            Reason::NoMatch => "NO_MATCH",
            Reason::CourseFull => "COURSE_FULL",
            Reason::CourseIdMissing => "COURSE_ID_MISSING",
            Reason::CardMissing => "CARD_MISSING",
            Reason::RedirectLogin => "REDIRECT_LOGIN",
            Reason::Unknown => "UNKNOWN",
        }
    }
}

/// 选中课程的摘要，仅用于日志展示
#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    pub title: String,
    pub time: String,
    pub href: String,
}

/// 一次预约尝试的完整结果
///
/// 每次尝试恰好产生一个实例，交给编排层做日志和重试判定。
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub success: bool,
    pub reason: Reason,
    /// 最后一次 HTTP 状态码
    pub http_status: Option<u16>,
    /// 站点响应里的业务 code
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub req_id: Option<String>,
    pub course: Option<CourseSummary>,
    /// 跟随重定向后的最终 URL
    pub final_url: Option<String>,
    /// 诊断用的自由文本
    pub evidence: Option<String>,
    /// 响应体开头片段
    pub raw_response: Option<String>,
    /// 仅 RATE_LIMIT 会置位
    pub retry_recommended: bool,
}

impl RunOutcome {
    /// 快捷构造一个失败结果
    pub fn failure(reason: Reason, msg: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            success: false,
            reason,
            msg: Some(msg.into()),
            evidence: Some(evidence.into()),
            retry_recommended: reason == Reason::RateLimit,
            ..Default::default()
        }
    }
}
