use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config_crate::DatabaseConfig;
use models::TradeRecord;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{mysql::MySqlPoolOptions, MySql, Pool};
use tracing::info;

/// 成交记录的持久化
#[async_trait]
pub trait TradeLog: Send + Sync {
    async fn append(&self, record: &TradeRecord) -> Result<()>;
}

/// 已保存的成交记录
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TradeRecordRow {
    pub id: i64,
    pub strategy: String,
    pub pair: String,
    /// 最小单位的利润 (十进制字符串，避免 int256 溢出)
    pub profit: String,
    pub profit_display: Decimal,
    pub token_symbol: String,
    pub tx_hash: String,
    pub created_at: DateTime<Utc>,
}

pub struct Database {
    pool: Pool<MySql>,
}

impl Database {
    /// 连接 MySQL 连接池
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// 初始化数据库表
    pub async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS arbitrage_transactions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                strategy VARCHAR(32) NOT NULL,
                pair VARCHAR(200) NOT NULL,
                profit VARCHAR(80) NOT NULL,
                profit_display DECIMAL(40, 18) NOT NULL,
                token_symbol VARCHAR(32) NOT NULL,
                tx_hash VARCHAR(66) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                INDEX idx_strategy (strategy),
                INDEX idx_created_at (created_at)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("✓ 套利交易记录表已创建/验证");

        Ok(())
    }

    /// 记录交易
    pub async fn insert_trade_record(&self, record: &TradeRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO arbitrage_transactions
            (strategy, pair, profit, profit_display, token_symbol, tx_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.strategy)
        .bind(&record.pair)
        .bind(record.profit.to_string())
        .bind(record.profit_display)
        .bind(&record.token_symbol)
        .bind(format!("{:?}", record.tx_hash))
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }

    /// 最近的成交记录 (新的在前)
    pub async fn list_trade_records(&self, limit: u32) -> Result<Vec<TradeRecordRow>> {
        let rows = sqlx::query_as::<_, TradeRecordRow>(
            "SELECT id, strategy, pair, profit, profit_display, token_symbol, tx_hash, created_at
             FROM arbitrage_transactions ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl TradeLog for Database {
    async fn append(&self, record: &TradeRecord) -> Result<()> {
        let id = self.insert_trade_record(record).await?;
        info!("交易记录已保存: #{} {:?}", id, record.tx_hash);
        Ok(())
    }
}
