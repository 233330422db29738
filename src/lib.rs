//! # Styd Reserve
//!
//! styd.cn 健身课自动预约器
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 唯一发起网络请求的模块
//! - `SiteClient` - 课表查询 / 订单页拉取 / 卡页拉取 / 确认提交
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯解析与决策，可离线测试
//! - `catalog_parser` - 课表 HTML → 课程列表
//! - `course_selector` - 关键字 + 占用率选课
//! - `order_harvester` - 订单页表单字段收集
//! - `card_resolver` - 会员卡解析与挑选
//! - `signal` - 站点文案分类器
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次预约尝试"的完整流程
//! - `BookingFlow` - 查询 → 选课 → 收集字段 → 选卡 → 提交 → 归因
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 账号 × 任务展开、有界重试、全局截止、并发与汇总
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::SiteClient;
pub use config::{AccountConfig, AppConfig, TaskConfig};
pub use error::ConfigError;
pub use models::{Course, CourseStatus, Reason, RunOutcome, RunRequest};
pub use orchestrator::{run_tasks, TaskExecutionRecord, TaskOverrides, TaskRuntimeSpec};
pub use workflow::BookingFlow;
