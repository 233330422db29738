/// 响应文案分类器
///
/// 站点的繁忙/已满/登录提示全靠页面文案识别，文案随站点改版会漂移，
/// 所以关键词表集中放在这里，可整体替换，流水线只依赖分类结果。
use crate::models::Reason;

/// 对响应体的粗分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSignal {
    /// 系统繁忙/频率限制
    Busy,
    /// 课程已满/不可约
    Full,
    /// 需要登录
    LoginRequired,
    /// 提示选择会员卡
    CardPrompt,
    /// 成功文案
    Success,
    /// 识别不出
    None,
}

/// 关键词分类器
#[derive(Debug, Clone)]
pub struct SignalClassifier {
    busy_keywords: Vec<String>,
    full_keywords: Vec<String>,
    login_keywords: Vec<String>,
    card_keywords: Vec<String>,
    success_keywords: Vec<String>,
}

impl Default for SignalClassifier {
    fn default() -> Self {
        // 站点当前文案，属于软约束
        Self {
            busy_keywords: to_vec(&["系统繁忙", "稍后再试", "操作频繁", "频繁"]),
            full_keywords: to_vec(&["课程已满", "排队", "不在可预约时间", "已满", "名额已满", "约满"]),
            login_keywords: to_vec(&["请先登录", "登录后访问", "手机号", "验证码"]),
            card_keywords: to_vec(&["请选择会员卡", "会员卡", "卡"]),
            success_keywords: to_vec(&["成功", "预约成功", "success"]),
        }
    }
}

fn to_vec(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| !kw.is_empty() && text.contains(kw.as_str()))
}

impl SignalClassifier {
    /// 自定义关键词表（测试或站点改版时替换）
    pub fn new(
        busy: &[&str],
        full: &[&str],
        login: &[&str],
        card: &[&str],
        success: &[&str],
    ) -> Self {
        Self {
            busy_keywords: to_vec(busy),
            full_keywords: to_vec(full),
            login_keywords: to_vec(login),
            card_keywords: to_vec(card),
            success_keywords: to_vec(success),
        }
    }

    pub fn is_busy(&self, text: &str) -> bool {
        contains_any(text, &self.busy_keywords)
    }

    pub fn is_login_prompt(&self, text: &str) -> bool {
        contains_any(text, &self.login_keywords)
    }

    pub fn is_success(&self, text: &str) -> bool {
        contains_any(text, &self.success_keywords)
    }

    /// URL 是否指向登录/认证页
    ///
    /// 订单页本身路径含 course/order，被重定向到登录页时不会再包含它
    pub fn is_login_redirect(&self, url: &str) -> bool {
        (url.contains("/login") || url.contains("/passport")) && !url.contains("course/order")
    }

    /// 按文案对失败响应体归因
    ///
    /// 匹配顺序即优先级：繁忙 > 选卡 > 已满 > 登录
    pub fn classify(&self, body: &str) -> ResponseSignal {
        if contains_any(body, &self.busy_keywords) {
            ResponseSignal::Busy
        } else if contains_any(body, &self.card_keywords) {
            ResponseSignal::CardPrompt
        } else if contains_any(body, &self.full_keywords) {
            ResponseSignal::Full
        } else if contains_any(body, &self.login_keywords) {
            ResponseSignal::LoginRequired
        } else if contains_any(body, &self.success_keywords) {
            ResponseSignal::Success
        } else {
            ResponseSignal::None
        }
    }

    /// 失败响应体 → 原因码
    pub fn failure_reason(&self, final_url: &str, body: &str) -> Reason {
        if self.is_login_redirect(final_url) {
            return Reason::RedirectLogin;
        }
        match self.classify(body) {
            ResponseSignal::Busy => Reason::RateLimit,
            ResponseSignal::CardPrompt => Reason::CardMissing,
            ResponseSignal::Full => Reason::CourseFull,
            ResponseSignal::LoginRequired => Reason::RedirectLogin,
            _ => Reason::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_keywords() {
        let classifier = SignalClassifier::default();
        assert!(classifier.is_busy("系统繁忙，请稍后再试"));
        assert!(!classifier.is_busy("一切正常"));
    }

    #[test]
    fn test_classify_priority() {
        let classifier = SignalClassifier::default();
        // 繁忙优先于其他类别
        assert_eq!(classifier.classify("系统繁忙"), ResponseSignal::Busy);
        assert_eq!(classifier.classify("请选择会员卡"), ResponseSignal::CardPrompt);
        assert_eq!(classifier.classify("课程已满"), ResponseSignal::Full);
        assert_eq!(classifier.classify("请先登录"), ResponseSignal::LoginRequired);
        assert_eq!(classifier.classify("毫无关系的文本"), ResponseSignal::None);
    }

    #[test]
    fn test_failure_reason_by_url() {
        let classifier = SignalClassifier::default();
        assert_eq!(
            classifier.failure_reason("https://www.styd.cn/passport/login", ""),
            Reason::RedirectLogin
        );
        // 订单页 URL 含 login 字样也不算重定向
        assert_eq!(
            classifier.failure_reason("https://www.styd.cn/m/x/course/order?id=1", "未知内容"),
            Reason::Unknown
        );
    }

    #[test]
    fn test_failure_reason_by_body() {
        let classifier = SignalClassifier::default();
        assert_eq!(classifier.failure_reason("https://x/", "操作频繁"), Reason::RateLimit);
        assert_eq!(classifier.failure_reason("https://x/", "名额已满"), Reason::CourseFull);
    }

    #[test]
    fn test_custom_keywords() {
        let classifier = SignalClassifier::new(&["busy"], &["full"], &["login"], &["card"], &["ok"]);
        assert_eq!(classifier.classify("server busy"), ResponseSignal::Busy);
        assert!(classifier.is_success("ok"));
    }
}
