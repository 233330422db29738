use thiserror::Error;

/// 配置错误
///
/// 任何任务执行之前就要报出来的问题；业务失败不会走这里，
/// 它们以 `RunOutcome` 的形式返回。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境文件读取失败 ({path}): {source}")]
    EnvFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("配置项 {key} 解析失败: {detail}")]
    InvalidValue { key: String, detail: String },
    #[error("ACCOUNTS[{index}] 缺少 cookie")]
    MissingCookie { index: usize },
}
