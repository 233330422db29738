/// 会员卡解析与挑选
///
/// "我的卡" 页面上每张卡带一个充值链接，member_card_id 和卡类别 id
/// 都藏在链接的查询串里。缺任一 ID 的条目直接丢弃。
use scraper::{Html, Selector};
use url::Url;

/// 关键字没有命中时的排序哨兵
const NO_MATCH_RANK: usize = 999;

/// 一张会员卡
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberCard {
    pub name: String,
    pub member_card_id: String,
    pub card_cat_id: String,
}

/// 从 "我的卡" 页面 HTML 解析卡列表
pub fn parse_cards_from_html(html: &str) -> Vec<MemberCard> {
    let document = Html::parse_document(html);
    let li_sel = Selector::parse(".user_card ul.card_list > li").unwrap();
    let name_sel = Selector::parse(".card_overview .name p").unwrap();
    let charge_sel = Selector::parse(".card_overview .charge a.charge_card[href]").unwrap();

    let mut cards = Vec::new();
    for li in document.select(&li_sel) {
        let name = li
            .select(&name_sel)
            .next()
            .map(|node| node.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let Some(anchor) = li.select(&charge_sel).next() else {
            continue;
        };
        let href = anchor.value().attr("href").unwrap_or("");
        let Some((member_card_id, card_cat_id)) = extract_card_ids(href) else {
            continue;
        };
        cards.push(MemberCard {
            name,
            member_card_id,
            card_cat_id,
        });
    }
    cards
}

/// 从充值链接查询串里取 member_card_id 与 id（后者即卡类别）
fn extract_card_ids(href: &str) -> Option<(String, String)> {
    // 相对链接补上基址只为借用 Url 的查询串解析
    let url = Url::parse(href)
        .or_else(|_| Url::parse("https://www.styd.cn").and_then(|base| base.join(href)))
        .ok()?;
    let mut member_card_id = None;
    let mut card_cat_id = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "member_card_id" => member_card_id = Some(value.to_string()),
            "id" => card_cat_id = Some(value.to_string()),
            _ => {}
        }
    }
    match (member_card_id, card_cat_id) {
        (Some(mc), Some(cc)) if !mc.is_empty() && !cc.is_empty() => Some((mc, cc)),
        _ => None,
    }
}

/// 按关键字优先级挑卡
///
/// 卡名里第一个命中的关键字序号越小越优先；全不命中时退回第一张
pub fn pick_card_by_keywords<'a>(
    cards: &'a [MemberCard],
    keywords: &[String],
) -> Option<&'a MemberCard> {
    if cards.is_empty() {
        return None;
    }
    let rank = |card: &MemberCard| {
        keywords
            .iter()
            .position(|kw| !kw.is_empty() && card.name.contains(kw.as_str()))
            .unwrap_or(NO_MATCH_RANK)
    };
    cards.iter().min_by_key(|card| rank(card))
}
