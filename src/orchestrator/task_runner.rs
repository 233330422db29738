//! 任务编排 - 编排层
//!
//! ## 职责
//!
//! 1. **展开**：把声明式配置（账号 × 任务）展开成可执行的 `TaskRuntimeSpec`
//! 2. **重试**：按任务配置做有界重试，只对 RATE_LIMIT 继续
//! 3. **截止**：可选的全局墙钟截止时间，只在每轮尝试开头检查
//! 4. **并发**：账号内按配置并发（Semaphore + spawn），账号之间顺序执行
//! 5. **汇总**：结果按任务原始序号还原顺序后返回
//!
//! 业务失败不会让本层报错；它只做调度、日志与统计。

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use rand::Rng;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{error, info};

use crate::config::{AccountConfig, AppConfig, TaskConfig};
use crate::models::{Reason, RunOutcome, RunRequest};
use crate::workflow::BookingFlow;

/// 对全部任务生效的一次性覆盖（来自 CLI/GUI）
///
/// 字段为 None 时沿用任务自身配置；列表是整体替换，不做合并
#[derive(Debug, Clone, Default)]
pub struct TaskOverrides {
    pub date: Option<String>,
    pub title_keywords: Option<Vec<String>>,
    pub time_keywords: Option<Vec<String>>,
    pub strict_match: Option<bool>,
    pub allow_fallback: Option<bool>,
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<(u64, u64)>,
}

/// 展开后的单条可执行任务
#[derive(Debug, Clone)]
pub struct TaskRuntimeSpec {
    /// 账号内的任务序号，用于并发执行后还原顺序
    pub index: usize,
    pub account: AccountConfig,
    /// 已解析的具体日期
    pub date: String,
    pub title_keywords: Vec<String>,
    pub time_keywords: Vec<String>,
    pub strict_match: bool,
    pub allow_fallback: bool,
    pub max_attempts: u32,
    pub delay_ms: (u64, u64),
}

/// 一条任务的最终执行记录
#[derive(Debug, Clone)]
pub struct TaskExecutionRecord {
    pub spec: TaskRuntimeSpec,
    pub outcome: RunOutcome,
    /// 实际发起的尝试次数
    pub attempts: u32,
}

/// 命名日期规则
///
/// `plus_7_after_17`：放号窗口开在 7 天后，前一天 17 点起可见次日名额，
/// 因此 17 点前抢 today+6，17 点后抢 today+7。这是运营规则，站点不提供。
pub fn compute_rule_date(rule: Option<&str>) -> Option<String> {
    let rule = rule?;
    if rule != "plus_7_after_17" {
        return None;
    }
    let now = Local::now();
    let delta_days = if now.hour() < 17 { 6 } else { 7 };
    let target = now.date_naive() + chrono::Days::new(delta_days);
    Some(target.format("%Y-%m-%d").to_string())
}

/// 日期优先级：显式覆盖 > 任务自带 > 日期规则 > 当天
fn resolve_date(task: &TaskConfig, overrides: &TaskOverrides, date_rule: Option<&str>) -> String {
    if let Some(date) = overrides.date.as_ref().filter(|d| !d.is_empty()) {
        return date.clone();
    }
    if let Some(date) = task.date.as_ref().filter(|d| !d.is_empty()) {
        return date.clone();
    }
    if let Some(date) = compute_rule_date(date_rule) {
        return date;
    }
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// 账号 × 任务 的笛卡尔展开
///
/// 没配任务时按单条默认任务处理
pub fn build_runtime_specs(config: &AppConfig, overrides: &TaskOverrides) -> Vec<TaskRuntimeSpec> {
    let default_tasks;
    let tasks: &[TaskConfig] = if config.tasks.is_empty() {
        default_tasks = [TaskConfig::default()];
        &default_tasks
    } else {
        &config.tasks
    };

    let mut specs = Vec::new();
    for account in &config.accounts {
        for (index, task) in tasks.iter().enumerate() {
            specs.push(TaskRuntimeSpec {
                index,
                account: account.clone(),
                date: resolve_date(task, overrides, config.date_rule.as_deref()),
                title_keywords: overrides
                    .title_keywords
                    .clone()
                    .unwrap_or_else(|| task.title_keywords.clone()),
                time_keywords: overrides
                    .time_keywords
                    .clone()
                    .unwrap_or_else(|| task.time_keywords.clone()),
                strict_match: overrides.strict_match.unwrap_or(task.strict_match),
                allow_fallback: overrides.allow_fallback.unwrap_or(task.allow_fallback),
                max_attempts: overrides.max_attempts.unwrap_or(task.max_attempts).max(1),
                delay_ms: overrides.delay_ms.unwrap_or(task.delay_ms),
            });
        }
    }
    specs
}

fn build_run_request(spec: &TaskRuntimeSpec, shop_id: &str) -> RunRequest {
    RunRequest {
        title_keywords: spec.title_keywords.clone(),
        time_keywords: spec.time_keywords.clone(),
        strict_match: spec.strict_match,
        allow_fallback: spec.allow_fallback,
        preferred_card_keywords: spec.account.preferred_cards.clone(),
        ..RunRequest::new(spec.account.cookie.clone(), spec.date.clone(), shop_id)
    }
}

/// 带重试执行单条任务，流水线可注入（测试用）
///
/// 截止时间只在每轮尝试开头检查，已在途的请求不会被打断
pub async fn run_single_task_with<F, Fut>(
    spec: TaskRuntimeSpec,
    shop_id: &str,
    deadline: Option<Instant>,
    mut run: F,
) -> TaskExecutionRecord
where
    F: FnMut(RunRequest) -> Fut,
    Fut: std::future::Future<Output = RunOutcome>,
{
    let mut attempts = 0;
    let mut outcome: Option<RunOutcome> = None;
    for attempt in 1..=spec.max_attempts {
        attempts = attempt;
        if deadline.is_some_and(|d| Instant::now() > d) {
            outcome = Some(RunOutcome::failure(
                Reason::Unknown,
                "Global timeout reached",
                "全局截止时间已过，跳过后续尝试",
            ));
            break;
        }
        let result = run(build_run_request(&spec, shop_id)).await;
        let stop = result.success || !result.retry_recommended || attempt == spec.max_attempts;
        outcome = Some(result);
        if stop {
            break;
        }
        let (low, high) = spec.delay_ms;
        let wait_ms = rand::rng().random_range(low..=high.max(low));
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
    }
    let outcome =
        outcome.unwrap_or_else(|| RunOutcome::failure(Reason::Unknown, "未执行", "max_attempts 为 0"));
    TaskExecutionRecord {
        spec,
        outcome,
        attempts,
    }
}

async fn run_single_task(
    spec: TaskRuntimeSpec,
    shop_id: &str,
    deadline: Option<Instant>,
) -> TaskExecutionRecord {
    run_single_task_with(spec, shop_id, deadline, |request| async move {
        BookingFlow::new().run_once(&request).await
    })
    .await
}

/// 执行全部配置任务
///
/// 账号组之间顺序执行；组内按 `concurrency` 并发。返回前按任务序号
/// 还原组内顺序，账号之间只保证分组相邻。
pub async fn run_tasks(
    config: &AppConfig,
    overrides: &TaskOverrides,
    shop_id_override: Option<&str>,
) -> Vec<TaskExecutionRecord> {
    let shop_id = shop_id_override.unwrap_or(&config.shop_id).to_string();
    let specs = build_runtime_specs(config, overrides);
    if specs.is_empty() {
        return Vec::new();
    }

    let deadline = config
        .global_timeout_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));

    // 按账号分组，保持配置顺序
    let mut groups: Vec<(String, Vec<TaskRuntimeSpec>)> = Vec::new();
    for spec in specs {
        match groups.iter_mut().find(|(name, _)| *name == spec.account.name) {
            Some((_, list)) => list.push(spec),
            None => groups.push((spec.account.name.clone(), vec![spec])),
        }
    }

    let concurrency = config.concurrency.max(1);
    let mut records = Vec::new();
    for (account_name, account_specs) in groups {
        info!("👤 [账号] {} - 待执行任务 {} 个", account_name, account_specs.len());
        let mut account_records = Vec::new();

        if concurrency <= 1 || account_specs.len() == 1 {
            for spec in account_specs {
                let record = run_single_task(spec, &shop_id, deadline).await;
                log_result(&record, config.log_json);
                account_records.push(record);
            }
        } else {
            let semaphore = Arc::new(Semaphore::new(concurrency));
            let mut handles = Vec::new();
            for spec in account_specs {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    // Semaphore 不会被关闭，防御性跳过
                    Err(_) => continue,
                };
                let shop_id = shop_id.clone();
                let log_json = config.log_json;
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    let record = run_single_task(spec, &shop_id, deadline).await;
                    log_result(&record, log_json);
                    record
                });
                handles.push(handle);
            }
            for handle in handles {
                match handle.await {
                    Ok(record) => account_records.push(record),
                    Err(err) => error!("❌ 任务执行失败: {}", err),
                }
            }
        }

        account_records.sort_by_key(|record| record.spec.index);
        records.extend(account_records);
    }
    records
}

// ========== 日志辅助函数 ==========

/// 输出单条任务结果
///
/// 人读行走 tracing；开启 LOG_JSON 时额外输出一行结构化 JSON
fn log_result(record: &TaskExecutionRecord, log_json: bool) {
    let spec = &record.spec;
    let outcome = &record.outcome;
    let status = if outcome.success { "SUCCESS" } else { "FAIL" };
    info!(
        "[任务][{}] {} | 标题关键字={:?} | 时段关键字={:?}",
        spec.account.name, spec.date, spec.title_keywords, spec.time_keywords
    );
    info!(
        "  -> 结果: {} | 原因: {} | HTTP: {:?} | code: {:?} | msg: {:?} | 尝试: {}",
        status,
        outcome.reason.as_str(),
        outcome.http_status,
        outcome.code,
        outcome.msg,
        record.attempts
    );
    if let Some(final_url) = &outcome.final_url {
        info!("  -> 最终URL: {}", final_url);
    }
    if let Some(evidence) = &outcome.evidence {
        info!("  -> 证据: {}", evidence);
    }
    if let Some(course) = &outcome.course {
        info!("  -> 课程: {} | {} | 链接: {}", course.title, course.time, course.href);
    }
    if log_json {
        let payload = json!({
            "ts": Local::now().to_rfc3339(),
            "account": spec.account.name,
            "task": {
                "date": spec.date,
                "title": spec.title_keywords,
                "time": spec.time_keywords,
            },
            "status": status,
            "reason": outcome.reason,
            "http": outcome.http_status,
            "code": outcome.code,
            "msg": outcome.msg,
            "req_id": outcome.req_id,
            "final_url": outcome.final_url,
            "evidence": outcome.evidence,
            "course": outcome.course,
            "attempts": record.attempts,
        });
        println!("{}", payload);
    }
}
