/// 站点兜底常量：解析失败时使用的会员卡 / 卡类别 / 课程 ID
pub const DEFAULT_MEMBER_CARD_ID: &str = "13413533";
pub const DEFAULT_CARD_CAT_ID: &str = "8566400";
pub const DEFAULT_COURSE_ID: &str = "8225475";

/// 一次预约尝试的全部入参
///
/// 由编排层按任务构建，构建后不再修改；每次尝试一个实例。
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// 原始 Cookie 串（已登录会话，整串透传）
    pub cookie: String,
    /// 预约日期，ISO 格式 YYYY-MM-DD
    pub date: String,
    pub shop_id: String,
    /// 标题关键字，按优先级排列
    pub title_keywords: Vec<String>,
    /// 时段关键字，按优先级排列
    pub time_keywords: Vec<String>,
    pub strict_match: bool,
    pub allow_fallback: bool,
    /// 选卡关键字（来自账号配置）
    pub preferred_card_keywords: Vec<String>,
    /// 在线解析失败时的兜底 ID
    pub default_member_card_id: Option<String>,
    pub default_card_cat_id: Option<String>,
    pub default_course_id: Option<String>,
}

impl RunRequest {
    /// 以站点兜底 ID 创建请求
    pub fn new(cookie: impl Into<String>, date: impl Into<String>, shop_id: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            date: date.into(),
            shop_id: shop_id.into(),
            title_keywords: Vec::new(),
            time_keywords: Vec::new(),
            strict_match: true,
            allow_fallback: true,
            preferred_card_keywords: Vec::new(),
            default_member_card_id: Some(DEFAULT_MEMBER_CARD_ID.to_string()),
            default_card_cat_id: Some(DEFAULT_CARD_CAT_ID.to_string()),
            default_course_id: Some(DEFAULT_COURSE_ID.to_string()),
        }
    }
}
