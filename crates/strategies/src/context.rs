use config_crate::{ArbitrageDefinitions, DefinitionSource};
use dex::{ChainClient, PoolProvider};
use ethers::types::{Address, Bytes, H256, I256, U256};
use models::units::from_base_units;
use models::{PoolToken, TradeRecord, VaultPool};
use rust_decimal::Decimal;
use services::ArbitrageEventSink;
use std::sync::Arc;
use tracing::{debug, info, warn};
use utils::TARGET_TRADE;

use crate::error::ArbitrageError;

/// 利润换算为代币单位，失败时记 0 (不影响已完成的交易)
fn profit_display(pair_label: &str, profit: I256, decimals: u8) -> Decimal {
    from_base_units(profit, decimals).unwrap_or_else(|e| {
        warn!(target: TARGET_TRADE, "⚠️  利润换算失败 {}: {}", pair_label, e);
        Decimal::ZERO
    })
}

/// 授权额度低于 1e9 个代币时重新授权
const ALLOWANCE_THRESHOLD_TOKENS: u64 = 1_000_000_000;

/// 按 symbol 查找代币在池子中的下标
pub fn lookup_asset_index(pool: &VaultPool, symbol: &str) -> Result<usize, ArbitrageError> {
    pool.token_index(symbol).ok_or_else(|| ArbitrageError::AssetNotFound {
        pool_id: pool.id,
        symbol: symbol.to_string(),
    })
}

/// `1e9 * 10^decimals`，溢出时取最大值
pub fn allowance_threshold(decimals: u8) -> U256 {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .and_then(|scale| scale.checked_mul(U256::from(ALLOWANCE_THRESHOLD_TOKENS)))
        .unwrap_or(U256::MAX)
}

/// 策略共享的外部依赖
#[derive(Clone)]
pub struct StrategyContext {
    pub pools: Arc<dyn PoolProvider>,
    pub chain: Arc<dyn ChainClient>,
    pub events: Arc<dyn ArbitrageEventSink>,
    pub definitions: Arc<dyn DefinitionSource>,
    /// 交易与授权的目标合约 (Balancer Vault)
    pub vault: Address,
}

impl StrategyContext {
    pub fn new(
        pools: Arc<dyn PoolProvider>,
        chain: Arc<dyn ChainClient>,
        events: Arc<dyn ArbitrageEventSink>,
        definitions: Arc<dyn DefinitionSource>,
        vault: Address,
    ) -> Self {
        Self {
            pools,
            chain,
            events,
            definitions,
            vault,
        }
    }

    pub fn signer(&self) -> Address {
        self.chain.signer_address()
    }

    pub async fn load_definitions(&self) -> Result<ArbitrageDefinitions, ArbitrageError> {
        Ok(self.definitions.load().await?)
    }

    pub async fn find_pool(&self, pool_id: H256) -> Result<VaultPool, ArbitrageError> {
        Ok(self.pools.find_pool(pool_id).await?)
    }

    /// 确保 Vault 对该代币有足够的授权额度，不足时授权 U256::MAX 并等待确认
    pub async fn ensure_allowance(&self, token: &PoolToken) -> Result<(), ArbitrageError> {
        if token.is_native() {
            debug!(target: TARGET_TRADE, "{} 为原生资产，无需授权", token.symbol);
            return Ok(());
        }

        let owner = self.signer();
        let current = self.chain.allowance(token.address, owner, self.vault).await?;
        if current >= allowance_threshold(token.decimals) {
            return Ok(());
        }

        info!(target: TARGET_TRADE, "🔓 {} 授权额度不足 ({})，重新授权", token.symbol, current);
        let receipt = self.chain.approve(token.address, self.vault, U256::MAX).await?;
        info!(target: TARGET_TRADE, "✅ {} 授权完成: {:?}", token.symbol, receipt.tx_hash);
        Ok(())
    }

    /// 向 Vault 发送交易并等待确认，返回交易哈希
    pub async fn submit(&self, call_data: Bytes) -> Result<H256, ArbitrageError> {
        let receipt = self
            .chain
            .submit(self.vault, call_data)
            .await
            .map_err(ArbitrageError::TradeSubmission)?;

        info!(
            target: TARGET_TRADE,
            "✅ 套利交易已确认: {:?} | Block: {:?} | Gas: {:?}",
            receipt.tx_hash,
            receipt.block_number,
            receipt.gas_used
        );
        Ok(receipt.tx_hash)
    }

    /// 生成成交记录并交给事件出口 (写库 / 通知)
    pub async fn record(
        &self,
        strategy: &str,
        pair_label: &str,
        profit: I256,
        tx_hash: H256,
        primary: &PoolToken,
    ) -> TradeRecord {
        let profit_display = profit_display(pair_label, profit, primary.decimals);

        let record = TradeRecord::new(strategy, pair_label, profit, &primary.symbol, profit_display, tx_hash);
        self.events.trade_succeeded(&record).await;
        record
    }
}
