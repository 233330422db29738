//! 业务能力层（Services）
//!
//! 流水线用到的纯解析/决策能力，全部无副作用、可离线测试：
//! - `catalog_parser` - 课表 HTML → 课程列表
//! - `course_selector` - 按关键字与占用率选课
//! - `order_harvester` - 订单页表单字段收集与 course_id 兜底
//! - `card_resolver` - 会员卡页解析与按关键字挑卡
//! - `signal` - 站点文案分类器（繁忙/已满/登录/成功）

pub mod card_resolver;
pub mod catalog_parser;
pub mod course_selector;
pub mod order_harvester;
pub mod signal;

pub use card_resolver::{parse_cards_from_html, pick_card_by_keywords, MemberCard};
pub use catalog_parser::parse_courses_from_html;
pub use course_selector::{select_course, SelectFailure};
pub use order_harvester::{extract_hidden_fields, recover_course_id};
pub use signal::{ResponseSignal, SignalClassifier};
