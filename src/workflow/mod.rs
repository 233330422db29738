//! 流程层（Workflow）
//!
//! `BookingFlow` 把查询/解析/选课/收集字段/选卡/提交串成一次完整尝试，
//! 每次尝试恰好产出一个 `RunOutcome`，重试与并发交给编排层。

pub mod booking_flow;

pub use booking_flow::BookingFlow;
