//! 应用启动引导模块
//!
//! 封装应用初始化、引擎启动和关闭逻辑

use anyhow::{Context, Result};
use api::{AppState, EngineRegistry, StartOutcome};
use config_crate::{AppConfig, JsonDefinitionFile};
use dex::BalancerVaultClient;
use ethers::prelude::*;
use ethers::signers::LocalWallet;
use services::{Database, EmailConfig, EmailNotifier, NotificationHub, RecordingEventSink, TelegramNotifier};
use std::sync::Arc;
use std::time::Duration;
use strategies::{ArbitrageEngine, EngineSettings, PairArbitrage, StrategyContext, TriangleArbitrage};
use tracing::{error, info, warn};

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// 应用程序实例
///
/// 持有引擎注册表与数据库连接，负责启动与关闭
pub struct Application {
    config: AppConfig,
    database: Option<Arc<Database>>,
    engines: Arc<EngineRegistry>,
}

impl Application {
    /// 初始化所有依赖并按 AUTO_START 启动引擎
    pub async fn start(config: AppConfig) -> Result<Self> {
        Self::log_config(&config);

        // 初始化钱包与 Provider
        let client = Self::init_client(&config).await?;
        let signer = client.address();
        info!("✅ 钱包地址: {:?}", signer);

        let vault = Arc::new(
            BalancerVaultClient::new(client, config.chain.vault_address, signer).with_confirmations(
                config.chain.confirmations,
                Duration::from_secs(config.chain.confirmation_timeout_secs),
            ),
        );

        // 初始化数据库 (可选)
        let database = Self::init_database(&config).await?;

        // 事件出口：写库 + 通知
        let mut events = RecordingEventSink::new().with_notifications(Self::init_notifications(&config));
        if let Some(database) = &database {
            events = events.with_trade_log(database.clone());
        }

        let ctx = StrategyContext::new(
            vault.clone(),
            vault,
            Arc::new(events),
            Arc::new(JsonDefinitionFile::new(&config.arbitrage.definitions_path)),
            config.chain.vault_address,
        );

        let pair_engine = ArbitrageEngine::new(
            Arc::new(PairArbitrage::new(ctx.clone())),
            EngineSettings::from_config(&config.arbitrage, &config.arbitrage.pair_lock_path),
        );
        let triangle_engine = ArbitrageEngine::new(
            Arc::new(TriangleArbitrage::new(ctx)),
            EngineSettings::from_config(&config.arbitrage, &config.arbitrage.triangle_lock_path),
        );

        let engines = Arc::new(
            EngineRegistry::new()
                .register(Arc::new(pair_engine))
                .register(Arc::new(triangle_engine)),
        );

        let app = Self {
            config,
            database,
            engines,
        };
        app.auto_start();
        Ok(app)
    }

    /// 运行 API 服务器直到收到 Ctrl-C
    pub async fn run_server(&self) -> Result<()> {
        let state = AppState::new(self.engines.clone(), self.database.clone());
        let app = api::create_router(state);

        self.log_startup_complete();

        api::start_server(app, &self.config.api.host, self.config.api.port, shutdown_signal()).await
    }

    /// 停止所有引擎并等待其退出
    pub async fn shutdown(self) -> Result<()> {
        info!("正在停止服务...");

        self.engines.stop_all();
        self.engines.join_all().await;

        info!("系统已停止");
        Ok(())
    }

    // ========== 私有辅助方法 ==========

    fn log_config(config: &AppConfig) {
        info!("Chain ID: {}", config.chain.chain_id);
        info!("RPC: {}", config.chain.rpc_url);
        info!("Vault: {:?}", config.chain.vault_address);
        info!("套利配置文件: {}", config.arbitrage.definitions_path.display());
        info!(
            "锁文件: pair={} triangle={}",
            config.arbitrage.pair_lock_path.display(),
            config.arbitrage.triangle_lock_path.display()
        );
        info!("确认数: {} (超时 {}s)", config.chain.confirmations, config.chain.confirmation_timeout_secs);
    }

    async fn init_client(config: &AppConfig) -> Result<Arc<SignerClient>> {
        info!("初始化以太坊 Provider...");
        let provider = Provider::<Http>::try_from(config.chain.rpc_url.as_str())
            .with_context(|| format!("Invalid RPC_URL: {}", config.chain.rpc_url))?;

        let wallet = config
            .wallet
            .private_key
            .parse::<LocalWallet>()
            .context("Invalid PRIVATE_KEY")?
            .with_chain_id(config.chain.chain_id);

        match provider.get_chainid().await {
            Ok(chain_id) if chain_id.as_u64() != config.chain.chain_id => {
                warn!("⚠️  RPC 返回的 chain id {} 与配置 {} 不一致", chain_id, config.chain.chain_id);
            }
            Ok(_) => {}
            Err(e) => warn!("⚠️  查询 chain id 失败: {}", e),
        }

        Ok(Arc::new(SignerMiddleware::new(provider, wallet)))
    }

    async fn init_database(config: &AppConfig) -> Result<Option<Arc<Database>>> {
        let Some(db_config) = &config.database else {
            warn!("⚠️  未配置数据库 (DB_HOST) - 交易记录只写日志");
            return Ok(None);
        };

        info!("初始化数据库连接...");
        let database = Database::connect(db_config).await?;
        database.initialize_tables().await?;
        info!("数据库初始化完成");
        Ok(Some(Arc::new(database)))
    }

    fn init_notifications(config: &AppConfig) -> NotificationHub {
        let mut hub = NotificationHub::new();

        if let Some(telegram) = &config.telegram {
            info!("✅ Telegram 通知已启用");
            hub = hub.with(Arc::new(TelegramNotifier::from_config(telegram)));
        }

        let email = EmailNotifier::new(EmailConfig::from_env());
        if email.is_active() {
            info!("✅ 邮件通知已启用");
            hub = hub.with(Arc::new(email));
        }

        if hub.is_empty() {
            info!("未配置通知渠道");
        }
        hub
    }

    fn auto_start(&self) {
        for name in &self.config.arbitrage.auto_start {
            match self.engines.spawn_start(name) {
                Some(StartOutcome::Spawned) => {}
                Some(StartOutcome::AlreadyActive(state)) => info!("引擎 {} 已处于 {}", name, state),
                None => warn!("⚠️  AUTO_START 中的引擎 {} 不存在 (可选: {:?})", name, self.engines.names()),
            }
        }
    }

    fn log_startup_complete(&self) {
        info!("========================================");
        info!("  系统启动完成");
        info!("  API: http://{}:{}", self.config.api.host, self.config.api.port);
        for snapshot in self.engines.snapshots() {
            info!("  引擎 {}: {} (锁 {})", snapshot.name, snapshot.state, snapshot.lock_path);
        }
        info!("========================================");
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("收到 Ctrl-C，准备退出"),
        Err(e) => error!("监听 Ctrl-C 失败: {}", e),
    }
}

/// 设置全局 panic hook
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("========================================");
        error!("!!! 系统发生 PANIC !!!");
        error!("========================================");
        if let Some(location) = panic_info.location() {
            error!(
                "发生位置: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }
        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            error!("Panic 消息: {}", s);
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            error!("Panic 消息: {}", s);
        }
        error!("========================================");
    }));
}
