//! 数据模型层
//!
//! 预约流水线各环节之间传递的纯数据结构：
//! - `Course` - 从课表 HTML 解析出的单节课
//! - `RunRequest` - 一次预约尝试的全部入参
//! - `RunOutcome` / `Reason` - 一次尝试的完整结果与原因码

pub mod course;
pub mod outcome;
pub mod request;

pub use course::{Course, CourseStatus};
pub use outcome::{CourseSummary, Reason, RunOutcome};
pub use request::RunRequest;
