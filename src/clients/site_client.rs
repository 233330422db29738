/// styd.cn 站点客户端
///
/// 封装全部线上交互：课表查询（XHR 头）、订单页与卡页拉取（浏览器导航头、
/// 跟随重定向）、订单确认提交（表单 POST，带繁忙微重试）。
/// 每个账号会话一个实例，Cookie 整串透传，不做进程级共享。
use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::services::SignalClassifier;

pub const BASE: &str = "https://www.styd.cn";
/// 门店空间段，站点路径固定部分
pub const SPACE: &str = "e74abd6e";

const MOBILE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 18_5 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.5 \
     Mobile/15E148 Safari/604.1 Edg/140.0.0.0";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(12);
const PAGE_TIMEOUT: Duration = Duration::from_secs(12);
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(10);
/// 确认提交总次数上限（含首发）
const CONFIRM_MAX_SUBMITS: usize = 2;
const CONFIRM_RETRY_SLEEP: Duration = Duration::from_millis(200);

/// 一次页面请求的结果
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    /// 跟随重定向后的最终 URL
    pub final_url: String,
    pub body: String,
}

/// 相对链接补全为站点绝对 URL
pub fn norm_url(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

/// 站点客户端
pub struct SiteClient {
    http: reqwest::Client,
    cookie: HeaderValue,
    base_url: String,
}

impl SiteClient {
    /// 以账号 Cookie 创建会话
    pub fn new(cookie: &str) -> Result<Self> {
        Self::with_base_url(cookie, BASE)
    }

    /// 指定基址创建（测试用）
    pub fn with_base_url(cookie: &str, base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("HTTP 客户端构建失败")?;
        let cookie = HeaderValue::from_str(cookie.trim()).context("Cookie 串包含非法字符")?;
        Ok(Self {
            http,
            cookie,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 站点首页 Referer（查询与卡页共用）
    pub fn default_referer(&self) -> String {
        format!("{}/m/{}/default/index?type=1", self.base_url, SPACE)
    }

    fn xhr_headers(&self, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("User-Agent", HeaderValue::from_static(MOBILE_UA));
        headers.insert(
            "Accept",
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            "Accept-Language",
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert("Referer", value);
        }
        headers.insert("Cookie", self.cookie.clone());
        headers
    }

    fn browser_headers(&self, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("User-Agent", HeaderValue::from_static(MOBILE_UA));
        headers.insert(
            "Accept",
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert("Referer", value);
        }
        headers.insert("Cookie", self.cookie.clone());
        headers
    }

    /// 查询某日课表
    ///
    /// 非 2xx 状态会转成带状态码的错误，交由流水线归因
    pub async fn fetch_search(&self, date: &str, shop_id: &str, tp: &str) -> Result<Value> {
        let url = format!("{}/m/{}/default/search", self.base_url, SPACE);
        let response = self
            .http
            .get(&url)
            .query(&[("date", date), ("shop_id", shop_id), ("type", tp)])
            .headers(self.xhr_headers(&self.default_referer()))
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let data = response.json::<Value>().await?;
        Ok(data)
    }

    /// 以浏览器导航头拉取页面（订单页/卡页），跟随重定向
    pub async fn get_page(&self, url: &str, referer: &str) -> Result<PageResponse> {
        let response = self
            .http
            .get(url)
            .headers(self.browser_headers(referer))
            .timeout(PAGE_TIMEOUT)
            .send()
            .await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok(PageResponse {
            status,
            final_url,
            body,
        })
    }

    /// 拉取 "我的卡" 页面
    pub async fn fetch_card_page(&self) -> Result<PageResponse> {
        let url = format!("{}/m/{}/user/card", self.base_url, SPACE);
        let page = self.get_page(&url, &self.default_referer()).await?;
        if page.status != 200 {
            anyhow::bail!("卡页返回状态码 {}", page.status);
        }
        Ok(page)
    }

    /// 提交订单确认
    ///
    /// 响应体出现繁忙文案或 JSON code == -1 时原地重试一次（共两次提交），
    /// 两次之间短暂休眠。这是与编排层外层重试独立的微重试。
    pub async fn post_order_confirm(
        &self,
        referer: &str,
        payload: &HashMap<String, String>,
        classifier: &SignalClassifier,
    ) -> Result<PageResponse> {
        let url = format!("{}/m/{}/course/order_confirm", self.base_url, SPACE);
        let mut headers = self.xhr_headers(referer);
        headers.insert(
            "Origin",
            HeaderValue::from_str(&self.base_url).unwrap_or(HeaderValue::from_static(BASE)),
        );

        let mut last: Option<PageResponse> = None;
        for attempt in 1..=CONFIRM_MAX_SUBMITS {
            let response = self
                .http
                .post(&url)
                .headers(headers.clone())
                .form(payload)
                .timeout(CONFIRM_TIMEOUT)
                .send()
                .await?;
            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let body = response.text().await?;

            let retry = should_retry_submit(&body, classifier);
            last = Some(PageResponse {
                status,
                final_url,
                body,
            });
            if !retry || attempt == CONFIRM_MAX_SUBMITS {
                break;
            }
            debug!("订单确认返回繁忙，{}ms 后重试", CONFIRM_RETRY_SLEEP.as_millis());
            tokio::time::sleep(CONFIRM_RETRY_SLEEP).await;
        }
        // 循环至少执行一次，last 必有值
        last.context("订单确认未产生响应")
    }
}

/// 确认响应是否触发微重试
pub fn should_retry_submit(body: &str, classifier: &SignalClassifier) -> bool {
    if classifier.is_busy(body) {
        return true;
    }
    if let Ok(data) = serde_json::from_str::<Value>(body) {
        if data.get("code").and_then(Value::as_i64) == Some(-1) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_url() {
        assert_eq!(
            norm_url(BASE, "/m/e74abd6e/course/order?id=1"),
            "https://www.styd.cn/m/e74abd6e/course/order?id=1"
        );
        assert_eq!(norm_url(BASE, "https://other/x"), "https://other/x");
        assert_eq!(norm_url(BASE, "m/x"), "https://www.styd.cn/m/x");
    }

    #[test]
    fn test_should_retry_submit_on_busy_text() {
        let classifier = SignalClassifier::default();
        assert!(should_retry_submit("系统繁忙，请稍后再试", &classifier));
        assert!(!should_retry_submit("{\"code\":200}", &classifier));
    }

    #[test]
    fn test_should_retry_submit_on_code_minus_one() {
        let classifier = SignalClassifier::default();
        assert!(should_retry_submit("{\"code\":-1,\"msg\":\"fail\"}", &classifier));
        assert!(!should_retry_submit("not json at all", &classifier));
    }

    #[test]
    fn test_client_rejects_bad_cookie() {
        assert!(SiteClient::new("bad\ncookie").is_err());
        assert!(SiteClient::new("PHPSESSID=abc; sass_gym_wap=xyz").is_ok());
    }
}
