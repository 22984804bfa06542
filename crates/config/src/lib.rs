mod definitions;

pub use definitions::*;

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Balancer V2 Vault (各链地址相同)
pub const DEFAULT_VAULT_ADDRESS: &str = "0xBA12222222228d8Ba445958a75a0704d566BF2C8";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 未配置 DB_HOST 时为 None，交易记录只写日志
    pub database: Option<DatabaseConfig>,
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
    pub arbitrage: ArbitrageConfig,
    pub telegram: Option<TelegramConfig>,
    pub api: ApiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    /// Balancer Vault 合约地址
    pub vault_address: Address,
    /// 每笔交易等待的确认数
    pub confirmations: usize,
    /// 等待确认的超时时间 (秒)
    pub confirmation_timeout_secs: u64,
}

#[derive(Clone)]
pub struct WalletConfig {
    pub private_key: String,
}

// 私钥不输出到日志
impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("private_key", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ArbitrageConfig {
    /// 套利对定义文件，每轮重新读取
    pub definitions_path: PathBuf,
    pub pair_lock_path: PathBuf,
    pub triangle_lock_path: PathBuf,
    /// 锁轮询间隔 (毫秒)
    pub lock_poll_interval_ms: u64,
    /// 等待锁的上限 (秒)，0 表示不限
    pub lock_wait_timeout_secs: u64,
    /// 两轮之间的间隔 (毫秒)
    pub pass_interval_ms: u64,
    /// 启动时自动运行的引擎
    pub auto_start: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
}

/// 读取环境变量，缺失或格式错误时使用默认值
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// 逗号分隔的列表
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // 加载 .env 文件
        dotenv::dotenv().ok();

        // 数据库配置 (可选)
        let database = match env::var("DB_HOST").ok().filter(|s| !s.is_empty()) {
            Some(db_host) => {
                let db_port = env::var("DB_PORT").unwrap_or_else(|_| "3306".to_string());
                let db_user = env::var("DB_USER").context("DB_USER not set")?;
                let db_password = env::var("DB_PASSWORD").context("DB_PASSWORD not set")?;
                let db_name = env::var("DB_NAME").context("DB_NAME not set")?;
                let max_connections = env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid DB_MAX_CONNECTIONS")?;

                // URL encode username and password to handle special characters
                let encoded_user = urlencoding::encode(&db_user);
                let encoded_password = urlencoding::encode(&db_password);

                Some(DatabaseConfig {
                    url: format!(
                        "mysql://{}:{}@{}:{}/{}",
                        encoded_user, encoded_password, db_host, db_port, db_name
                    ),
                    max_connections,
                })
            }
            None => None,
        };

        // 链配置
        let vault_address = env::var("VAULT_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_VAULT_ADDRESS.to_string())
            .parse::<Address>()
            .context("Invalid VAULT_ADDRESS")?;

        let chain = ChainConfig {
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("Invalid CHAIN_ID")?,
            rpc_url: env::var("RPC_URL").context("RPC_URL not set")?,
            vault_address,
            confirmations: env_or("CONFIRMATIONS", 1),
            confirmation_timeout_secs: env_or("CONFIRMATION_TIMEOUT_SECS", 120),
        };

        // 钱包配置
        let wallet = WalletConfig {
            private_key: env::var("PRIVATE_KEY")
                .ok()
                .filter(|s| !s.is_empty())
                .context("PRIVATE_KEY not set")?,
        };

        // 套利配置
        let arbitrage = ArbitrageConfig {
            definitions_path: PathBuf::from(
                env::var("ARBITRAGE_CONFIG_PATH").unwrap_or_else(|_| "arbitrage.json".to_string()),
            ),
            pair_lock_path: PathBuf::from(
                env::var("PAIR_LOCK_PATH").unwrap_or_else(|_| "pair.arbitrage.lock".to_string()),
            ),
            triangle_lock_path: PathBuf::from(
                env::var("TRIANGLE_LOCK_PATH").unwrap_or_else(|_| "triangle.arbitrage.lock".to_string()),
            ),
            lock_poll_interval_ms: env_or("LOCK_POLL_INTERVAL_MS", 50),
            lock_wait_timeout_secs: env_or("LOCK_WAIT_TIMEOUT_SECS", 300),
            pass_interval_ms: env_or("PASS_INTERVAL_MS", 0),
            auto_start: parse_list(
                &env::var("AUTO_START").unwrap_or_else(|_| "pair,triangle".to_string()),
            ),
        };

        // Telegram 通知 (可选)
        let telegram = match (
            env::var("TELEGRAM_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            env::var("TELEGRAM_CHAT_ID").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        // API 配置
        let api = ApiConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "9530".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
        };

        // 日志配置
        let log = LogConfig {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        };

        Ok(Self {
            database,
            chain,
            wallet,
            arbitrage,
            telegram,
            api,
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("Pair, triangle ,,"), vec!["pair", "triangle"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_default_vault_address_parses() {
        assert!(DEFAULT_VAULT_ADDRESS.parse::<Address>().is_ok());
    }

    #[test]
    fn test_wallet_debug_hides_key() {
        let wallet = WalletConfig {
            private_key: "deadbeef".to_string(),
        };
        assert!(!format!("{:?}", wallet).contains("deadbeef"));
    }
}
