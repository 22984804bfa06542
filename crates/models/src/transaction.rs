use chrono::{DateTime, Utc};
use ethers::types::{H256, I256, U256};
use rust_decimal::Decimal;

/// 已确认交易的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceiptSummary {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    pub success: bool,
}

/// 成功套利的记录，写入后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    /// 策略名 (pair / triangle)
    pub strategy: String,
    pub pair: String,
    /// 利润 (最小单位)
    pub profit: I256,
    /// 计价代币符号
    pub token_symbol: String,
    /// 换算后的利润，用于展示
    pub profit_display: Decimal,
    pub tx_hash: H256,
    pub created_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn new(
        strategy: impl Into<String>,
        pair: impl Into<String>,
        profit: I256,
        token_symbol: impl Into<String>,
        profit_display: Decimal,
        tx_hash: H256,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            pair: pair.into(),
            profit,
            token_symbol: token_symbol.into(),
            profit_display,
            tx_hash,
            created_at: Utc::now(),
        }
    }

    /// 日志与通知共用的文本
    pub fn summary(&self) -> String {
        format!(
            "Arbitrage {} with profit {} {} TransactionHash: {:?}",
            self.pair,
            self.profit_display.normalize(),
            self.token_symbol,
            self.tx_hash
        )
    }
}
