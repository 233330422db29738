//! 离线集成测试：不发网络请求，走真实的解析/选课/编排路径

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use styd_reserve::config::{load_app_config_from, AccountConfig, AppConfig, TaskConfig};
use styd_reserve::models::{Reason, RunOutcome};
use styd_reserve::orchestrator::{build_runtime_specs, run_single_task_with, TaskOverrides};
use styd_reserve::services::{
    extract_hidden_fields, parse_courses_from_html, recover_course_id, select_course,
};
use styd_reserve::{BookingFlow, RunRequest};

const CLASS_LIST: &str = r#"
    <ul class="course_list">
      <li>
        <a class="course_link" href="/m/e74abd6e/course/order?id=8225475"></a>
        <div class="course_detail">
          <p class="name">健身中心（午）</p>
          <p class="date"><b>12:00-13:00</b></p>
        </div>
        <div class="course_thumbs"><span>90/100</span></div>
        <div class="book_status"><i class="course_status hot"></i></div>
      </li>
      <li>
        <a class="course_link" href="/m/e74abd6e/course/order?id=8225476"></a>
        <div class="course_detail">
          <p class="name">健身中心（晚）</p>
          <p class="date"><b>19:00-20:00</b></p>
        </div>
        <div class="course_thumbs"><span>20/100</span></div>
        <div class="book_status"><i class="course_status available"></i></div>
      </li>
    </ul>
"#;

#[test]
fn parse_then_select_prefers_title_keyword() {
    let courses = parse_courses_from_html(CLASS_LIST);
    assert_eq!(courses.len(), 2);

    let title_kw = vec!["健身中心（午）".to_string()];
    let selected = select_course(&courses, &title_kw, &[], true, true).unwrap();
    // 午场占用率更高，但标题关键字优先级压过占用率
    assert_eq!(selected.title, "健身中心（午）");
    assert!(selected.href.contains("id=8225475"));
}

#[test]
fn parse_then_select_without_keywords_takes_emptier_course() {
    let courses = parse_courses_from_html(CLASS_LIST);
    let selected = select_course(&courses, &[], &[], true, true).unwrap();
    assert_eq!(selected.title, "健身中心（晚）");
}

#[test]
fn harvest_order_page_end_to_end() {
    let order_html = r#"
        <form action="/m/e74abd6e/course/order_confirm" method="post">
          <input type="hidden" name="course_id" value="8225475">
          <input type="hidden" name="shop_id" value="612773420">
          <select name="member_card_id">
            <option value="13413533" selected>年卡</option>
            <option value="13413534">次卡</option>
          </select>
        </form>
    "#;
    let mut fields = extract_hidden_fields(order_html);
    recover_course_id(&mut fields, order_html, None);

    assert_eq!(fields["course_id"], "8225475");
    assert_eq!(fields["shop_id"], "612773420");
    assert_eq!(fields["member_card_id"], "13413533");
    assert_eq!(fields["quantity"], "1");
    assert_eq!(fields["note"], "");
}

fn offline_config(accounts: usize, tasks: usize, concurrency: usize) -> AppConfig {
    AppConfig {
        shop_id: "SHOP_0001".to_string(),
        accounts: (0..accounts)
            .map(|i| AccountConfig {
                name: format!("account-{}", i + 1),
                cookie: "PHPSESSID=test".to_string(),
                preferred_cards: Vec::new(),
            })
            .collect(),
        tasks: (0..tasks).map(|_| TaskConfig::default()).collect(),
        date_rule: None,
        global_timeout_ms: None,
        concurrency,
        log_json: false,
    }
}

#[test]
fn expansion_matches_accounts_times_tasks() {
    let config = offline_config(2, 3, 1);
    let specs = build_runtime_specs(&config, &TaskOverrides::default());
    assert_eq!(specs.len(), 6);
}

#[tokio::test]
async fn retry_loop_with_injected_pipeline() {
    let config = offline_config(1, 1, 1);
    let mut specs = build_runtime_specs(&config, &TaskOverrides::default());
    let mut spec = specs.remove(0);
    spec.max_attempts = 3;
    spec.delay_ms = (0, 0);

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let record = run_single_task_with(spec, "SHOP_0001", None, move |request: RunRequest| {
        let counter = counter.clone();
        async move {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.shop_id, "SHOP_0001");
            if attempt < 2 {
                RunOutcome::failure(Reason::RateLimit, "系统繁忙", "")
            } else {
                RunOutcome {
                    success: true,
                    reason: Reason::Ok,
                    ..Default::default()
                }
            }
        }
    })
    .await;

    assert_eq!(record.attempts, 3);
    assert!(record.outcome.success);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn config_round_trip_from_env_maps() {
    let env_file: HashMap<String, String> = [
        (
            "ACCOUNTS".to_string(),
            r#"[{"name":"主号","cookie":"PHPSESSID=a","preferred_cards":["年卡"]}]"#.to_string(),
        ),
        (
            "TASKS".to_string(),
            r#"[{"title_keywords":["健身中心（午）"],"time_keywords":["12:00"],"max_attempts":2}]"#
                .to_string(),
        ),
        ("CONCURRENCY".to_string(), "2".to_string()),
    ]
    .into();
    let config = load_app_config_from(&env_file, &HashMap::new(), &HashMap::new()).unwrap();
    let specs = build_runtime_specs(&config, &TaskOverrides::default());
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].account.preferred_cards, vec!["年卡".to_string()]);
    assert_eq!(specs[0].title_keywords, vec!["健身中心（午）".to_string()]);
    assert_eq!(specs[0].max_attempts, 2);
}

/// 需要有效 Cookie 的真机测试：cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn live_run_once_with_real_cookie() {
    let cookie = std::env::var("STYD_COOKIE").expect("需要设置 STYD_COOKIE 环境变量");
    let request = RunRequest::new(cookie, "2026-08-31", "612773420");
    let outcome = BookingFlow::new().run_once(&request).await;
    println!("outcome: {:?}", outcome);
}
