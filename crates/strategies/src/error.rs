use dex::DexError;
use ethers::types::{H256, U256};
use models::UnitsError;
use std::time::Duration;
use thiserror::Error;

/// 套利处理错误
///
/// 除 `Config` 外都只影响当前套利对
#[derive(Debug, Error)]
pub enum ArbitrageError {
    #[error("Can not find {symbol} in pool: {pool_id:?}")]
    AssetNotFound { pool_id: H256, symbol: String },

    #[error("Invalid definition {label}: {reason}")]
    InvalidDefinition { label: String, reason: String },

    #[error(transparent)]
    Units(#[from] UnitsError),

    #[error(transparent)]
    Dex(#[from] DexError),

    #[error("Aggregate profit overflows at amount {0}")]
    ProfitOverflow(U256),

    #[error("Trade submission failed: {0}")]
    TradeSubmission(#[source] DexError),

    #[error("{strategy} strategy cannot trade a {request} request")]
    UnsupportedRequest {
        strategy: &'static str,
        request: &'static str,
    },

    #[error("Gave up waiting for lock {path} after {waited:?}")]
    LockTimeout { path: String, waited: Duration },

    #[error("Lock file error: {0}")]
    Lock(#[from] std::io::Error),

    #[error("Failed to load definitions: {0}")]
    Config(String),
}

impl ArbitrageError {
    pub fn invalid_definition(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            label: label.into(),
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for ArbitrageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(format!("{:#}", err))
    }
}
