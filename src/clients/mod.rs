//! 基础设施层（Clients）
//!
//! 唯一直接发起网络请求的模块。上层只拿到结构化的响应，
//! 不关心请求头、重定向与微重试细节。

pub mod site_client;

pub use site_client::{norm_url, should_retry_submit, PageResponse, SiteClient, BASE, SPACE};
