use std::process::ExitCode;

use tracing::{error, info, warn};

use styd_reserve::orchestrator::{run_tasks, TaskOverrides};
use styd_reserve::{config, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志
    utils::logging::init();

    // 加载配置（默认值 < .env < 环境变量）
    let config = match config::load_app_config() {
        Ok(config) => config,
        Err(err) => {
            error!("❌ 配置加载失败: {}", err);
            return ExitCode::from(1);
        }
    };

    info!("🚀 程序启动 - 多账号预约模式");
    info!("🏪 门店: {} | 账号 {} 个 | 任务 {} 个 | 并发 {}",
        config.shop_id,
        config.accounts.len(),
        config.tasks.len(),
        config.concurrency
    );

    let records = run_tasks(&config, &TaskOverrides::default(), None).await;
    if records.is_empty() {
        warn!("⚠️ 未发现可执行的任务，请检查 ACCOUNTS/TASKS 配置");
        return ExitCode::from(1);
    }

    let success = records.iter().filter(|r| r.outcome.success).count();
    let total = records.len();
    info!("📊 全部任务完成: 成功 {}/{}", success, total);

    if success == total {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}
