/// 课程状态
///
/// 取自课表条目状态节点的 class 列表，站点目前只会出现这五种；
/// 解析不到时记为 `Unknown`，不影响后续流程。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    Available,
    Hot,
    Full,
    Stop,
    Queue,
    Unknown,
}

impl CourseStatus {
    /// 从状态节点的 class 串中识别状态
    ///
    /// 按固定顺序匹配，第一个命中的生效
    pub fn from_class_attr(classes: &str) -> Self {
        const KNOWN: [(&str, CourseStatus); 5] = [
            ("available", CourseStatus::Available),
            ("hot", CourseStatus::Hot),
            ("full", CourseStatus::Full),
            ("stop", CourseStatus::Stop),
            ("queue", CourseStatus::Queue),
        ];
        for (token, status) in KNOWN {
            if classes.contains(token) {
                return status;
            }
        }
        CourseStatus::Unknown
    }

    /// 是否可预约（available / hot / queue）
    pub fn is_bookable(self) -> bool {
        matches!(
            self,
            CourseStatus::Available | CourseStatus::Hot | CourseStatus::Queue
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::Available => "available",
            CourseStatus::Hot => "hot",
            CourseStatus::Full => "full",
            CourseStatus::Stop => "stop",
            CourseStatus::Queue => "queue",
            CourseStatus::Unknown => "unknown",
        }
    }
}

/// 单节可预约课程
///
/// 每次查询响应重新构建，选课完成后即丢弃，不做持久化。
#[derive(Debug, Clone)]
pub struct Course {
    /// 课程名称
    pub title: String,
    /// 时段文本，例如 "12:00-13:00"
    pub time: String,
    /// 已报名人数
    pub taken: u32,
    /// 总容量，0 表示未知/未展示
    pub total: u32,
    pub status: CourseStatus,
    /// 订单页链接（站内相对路径或完整 URL）
    pub href: String,
}

impl Course {
    /// 排序用的占用率
    ///
    /// total 为 0 时数据不可信，按 1.0（最满）处理，使其排到最后
    pub fn occupancy_ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            f64::from(self.taken) / f64::from(self.total)
        }
    }
}
