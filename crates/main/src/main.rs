mod bootstrap;

use anyhow::Result;
use config_crate::AppConfig;
use tracing::info;
use utils::LoggerManager;

use crate::bootstrap::{setup_panic_hook, Application};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志系统
    let _logger = LoggerManager::init(&config.log.dir, &config.log.level);

    // 设置 panic hook
    setup_panic_hook();

    info!("========================================");
    info!("  Balancer 套利引擎启动");
    info!("========================================");

    let app = Application::start(config).await?;

    // 运行 API 服务器（阻塞，Ctrl-C 退出）
    if let Err(e) = app.run_server().await {
        tracing::error!("API 服务器异常退出: {:#}", e);
    }

    // 停止引擎并释放锁
    app.shutdown().await?;

    Ok(())
}
