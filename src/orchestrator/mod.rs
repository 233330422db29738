//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 把声明式配置翻译成一批可执行任务并跑完它们：
//! 账号 × 任务展开、日期解析、有界重试、全局截止、账号内并发、结果汇总。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::run_tasks (批量 TaskRuntimeSpec)
//!     ↓
//! workflow::BookingFlow (单次预约尝试)
//!     ↓
//! services (解析 / 选课 / 收集字段 / 选卡 / 文案归类)
//!     ↓
//! clients::SiteClient (网络请求)
//! ```

pub mod task_runner;

pub use task_runner::{
    build_runtime_specs, compute_rule_date, run_single_task_with, run_tasks, TaskExecutionRecord,
    TaskOverrides, TaskRuntimeSpec,
};
