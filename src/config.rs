/// 程序配置
///
/// 四层来源按优先级合并：默认值 < .env 文件 < 进程环境变量 < 显式覆盖，
/// 后来者只有取到非空值时才覆盖前者。ACCOUNTS / TASKS 的值是 JSON 数组。
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// 一个已登录账号
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub name: String,
    /// 原始 Cookie 串
    pub cookie: String,
    /// 选卡关键字，按优先级排列
    pub preferred_cards: Vec<String>,
}

/// 一条声明式任务
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub title_keywords: Vec<String>,
    #[serde(default)]
    pub time_keywords: Vec<String>,
    /// 固定日期，缺省时由日期规则或当天兜底
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default = "default_true")]
    pub strict_match: bool,
    #[serde(default = "default_true")]
    pub allow_fallback: bool,
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    /// 重试间隔区间，毫秒
    #[serde(default = "default_delay")]
    pub delay_ms: (u64, u64),
}

fn default_true() -> bool {
    true
}

fn default_attempts() -> u32 {
    1
}

fn default_delay() -> (u64, u64) {
    (120, 300)
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            title_keywords: Vec::new(),
            time_keywords: Vec::new(),
            date: None,
            strict_match: true,
            allow_fallback: true,
            max_attempts: 1,
            delay_ms: default_delay(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub shop_id: String,
    pub accounts: Vec<AccountConfig>,
    pub tasks: Vec<TaskConfig>,
    /// 命名日期规则，见编排层 `compute_rule_date`
    pub date_rule: Option<String>,
    /// 全部任务的墙钟截止时间，毫秒
    pub global_timeout_ms: Option<u64>,
    /// 单账号内的任务并发数
    pub concurrency: usize,
    pub log_json: bool,
}

const DEFAULT_SHOP_ID: &str = "SHOP_0001";

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cookie: Option<String>,
    #[serde(default)]
    preferred_cards: Vec<String>,
}

/// 从 .env 文件与进程环境加载配置
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    let env_file = read_env_file(".env")?;
    let env: HashMap<String, String> = std::env::vars().collect();
    load_app_config_from(&env_file, &env, &HashMap::new())
}

/// 从显式的键值来源加载配置（测试与前端复用）
pub fn load_app_config_from(
    env_file: &HashMap<String, String>,
    env: &HashMap<String, String>,
    overrides: &HashMap<String, String>,
) -> Result<AppConfig, ConfigError> {
    // 后面的来源优先，空值不覆盖
    let lookup = |key: &str| -> Option<String> {
        for source in [overrides, env, env_file] {
            if let Some(value) = source.get(key) {
                if !value.trim().is_empty() {
                    return Some(value.clone());
                }
            }
        }
        None
    };

    let shop_id = lookup("SHOP_ID").unwrap_or_else(|| DEFAULT_SHOP_ID.to_string());
    let accounts = match lookup("ACCOUNTS") {
        Some(raw) => parse_accounts(&raw)?,
        None => Vec::new(),
    };
    let tasks = match lookup("TASKS") {
        Some(raw) => parse_tasks(&raw)?,
        None => Vec::new(),
    };
    let date_rule = lookup("DATE_RULE");
    let global_timeout_ms = match lookup("GLOBAL_TIMEOUT_MS") {
        Some(raw) => Some(parse_int(&raw, "GLOBAL_TIMEOUT_MS")?),
        None => None,
    };
    let concurrency = match lookup("CONCURRENCY") {
        Some(raw) => parse_int(&raw, "CONCURRENCY")? as usize,
        None => 1,
    };
    let log_json = lookup("LOG_JSON").map(|v| parse_bool(&v)).unwrap_or(false);

    Ok(AppConfig {
        shop_id,
        accounts,
        tasks,
        date_rule,
        global_timeout_ms,
        concurrency: concurrency.max(1),
        log_json,
    })
}

/// 读取 .env 文件；不存在视为空
pub fn read_env_file(path: &str) -> Result<HashMap<String, String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::EnvFileRead {
        path: path.to_string(),
        source,
    })?;
    Ok(parse_env_content(&content))
}

fn parse_env_content(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        let mut value = value.trim();
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }
        values.insert(key, value.to_string());
    }
    values
}

fn parse_accounts(raw: &str) -> Result<Vec<AccountConfig>, ConfigError> {
    let parsed: Vec<RawAccount> =
        serde_json::from_str(raw).map_err(|err| ConfigError::InvalidValue {
            key: "ACCOUNTS".to_string(),
            detail: err.to_string(),
        })?;
    let mut accounts = Vec::with_capacity(parsed.len());
    for (index, item) in parsed.into_iter().enumerate() {
        let cookie = item.cookie.unwrap_or_default();
        if cookie.is_empty() {
            return Err(ConfigError::MissingCookie { index });
        }
        accounts.push(AccountConfig {
            name: item
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("account-{}", index + 1)),
            cookie,
            preferred_cards: item.preferred_cards,
        });
    }
    Ok(accounts)
}

fn parse_tasks(raw: &str) -> Result<Vec<TaskConfig>, ConfigError> {
    let mut tasks: Vec<TaskConfig> =
        serde_json::from_str(raw).map_err(|err| ConfigError::InvalidValue {
            key: "TASKS".to_string(),
            detail: err.to_string(),
        })?;
    for task in &mut tasks {
        task.max_attempts = task.max_attempts.max(1);
    }
    Ok(tasks)
}

fn parse_int(raw: &str, key: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        detail: format!("无法将 {:?} 转换为整数", raw),
    })
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
