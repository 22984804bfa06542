use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, I256, U256};
use models::{AssetDeltas, PairTradeRequest, TriangleTradeRequest, TxReceiptSummary, VaultPool};
use thiserror::Error;

/// DEX / 链交互错误
#[derive(Debug, Clone, Error)]
pub enum DexError {
    #[error("Pool not found: {0:?}")]
    PoolNotFound(H256),

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Transaction reverted: {0:?}")]
    Reverted(H256),

    #[error("Transaction dropped: {0:?}")]
    Dropped(H256),

    #[error("Timeout waiting for transaction {0:?}")]
    ConfirmationTimeout(H256),
}

/// Vault 池子查询与兑换模拟
///
/// 模拟调用只读，不会产生链上交易
#[async_trait]
pub trait PoolProvider: Send + Sync {
    /// 按 poolId 查询池子及其代币 (symbol / decimals)
    async fn find_pool(&self, pool_id: H256) -> Result<VaultPool, DexError>;

    /// 模拟两池闪电互换，返回每个资产的收益 (正数为获利)
    async fn query_flash_swap(&self, request: &PairTradeRequest) -> Result<AssetDeltas, DexError>;

    /// 模拟批量兑换，返回 Vault 视角的净变化 (负数为用户获得)
    async fn query_batch_swap(&self, request: &TriangleTradeRequest) -> Result<Vec<I256>, DexError>;

    /// 闪电互换的 batchSwap calldata
    fn encode_flash_swap(&self, request: &PairTradeRequest, wallet: Address) -> Result<Bytes, DexError>;

    /// 带限额与截止时间的 batchSwap calldata
    fn encode_batch_swap(
        &self,
        request: &TriangleTradeRequest,
        limits: &[I256],
        deadline: U256,
    ) -> Result<Bytes, DexError>;
}

/// 签名钱包的链上操作
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn signer_address(&self) -> Address;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256, DexError>;

    /// 授权并等待确认
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxReceiptSummary, DexError>;

    /// 发送交易并等待确认
    async fn submit(&self, to: Address, data: Bytes) -> Result<TxReceiptSummary, DexError>;
}
