//! 三池循环套利
//!
//! token1 -> token2 -> token3 -> token1 三步放在一笔 batchSwap 中，
//! 任意一步失败整笔回滚。

use async_trait::async_trait;
use config_crate::DefinitionSet;
use dex::{PoolProvider, NO_DEADLINE};
use ethers::types::{Address, H256, I256, U256};
use models::units::from_base_units;
use models::{
    ArbitrageDefinition, AssetDeltas, FundManagement, PoolToken, ProfitResult, TradeRequest, TriangleDefinition,
    TriangleTradeRequest,
};
use tracing::{debug, info};
use utils::TARGET_STRATEGY;

use crate::context::{lookup_asset_index, StrategyContext};
use crate::error::ArbitrageError;
use crate::profit_search::{ProbeSource, ProfitSearch};
use crate::strategy::{ArbitrageStrategy, PairOutcome, ScaledAmounts};

/// Vault 视角的净变化取反后按资产地址归集
pub fn vault_deltas_to_gains(assets: &[Address], deltas: &[I256]) -> AssetDeltas {
    let mut gains = AssetDeltas::new();
    for (asset, delta) in assets.iter().zip(deltas) {
        let gain = gains.entry(*asset).or_insert_with(I256::zero);
        *gain = gain.saturating_sub(*delta);
    }
    gains
}

/// 按首步金额模拟循环兑换
struct BatchSwapProbe<'a> {
    pools: &'a dyn PoolProvider,
    request: &'a TriangleTradeRequest,
}

#[async_trait]
impl<'a> ProbeSource for BatchSwapProbe<'a> {
    async fn probe(&self, amount: U256) -> Result<AssetDeltas, ArbitrageError> {
        let request = self.request.with_input_amount(amount);
        let deltas = self.pools.query_batch_swap(&request).await?;
        Ok(vault_deltas_to_gains(&request.assets, &deltas))
    }
}

pub struct TriangleArbitrage {
    ctx: StrategyContext,
}

impl TriangleArbitrage {
    pub const NAME: &'static str = "triangle";

    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }

    /// 第 i 个代币从第 i 个池子中查找
    async fn resolve_tokens(
        &self,
        label: &str,
        pool_ids: [H256; 3],
        symbols: &[&str],
    ) -> Result<[PoolToken; 3], ArbitrageError> {
        let mut tokens = Vec::with_capacity(3);
        for (pool_id, symbol) in pool_ids.iter().zip(symbols) {
            let pool = self.ctx.find_pool(*pool_id).await?;
            let index = lookup_asset_index(&pool, symbol)?;
            let token = pool.token(index).cloned().ok_or_else(|| ArbitrageError::AssetNotFound {
                pool_id: pool.id,
                symbol: symbol.to_string(),
            })?;
            tokens.push(token);
        }

        <[PoolToken; 3]>::try_from(tokens)
            .map_err(|_| ArbitrageError::invalid_definition(label, "expected 3 tokens"))
    }
}

#[async_trait]
impl ArbitrageStrategy for TriangleArbitrage {
    type Definition = TriangleDefinition;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    async fn list_pairs(&self) -> Result<DefinitionSet<TriangleDefinition>, ArbitrageError> {
        Ok(self.ctx.load_definitions().await?.triangle)
    }

    async fn handle_pair(&self, definition: &TriangleDefinition, retry: usize) -> Result<PairOutcome, ArbitrageError> {
        let label = definition.label();
        let symbols = definition.symbol_list();
        let pool_ids = <[H256; 3]>::try_from(definition.pool_ids()).map_err(|_| {
            ArbitrageError::invalid_definition(label, format!("expected 3 pools, got {}", definition.pool_ids().len()))
        })?;
        if symbols.len() != 3 {
            return Err(ArbitrageError::invalid_definition(
                label,
                format!("expected 3 symbols, got {}", symbols.len()),
            ));
        }

        let tokens = self.resolve_tokens(label, pool_ids, &symbols).await?;
        for token in &tokens {
            self.ctx.ensure_allowance(token).await?;
        }
        let primary = &tokens[0];

        let scaled = ScaledAmounts::from_definition(definition, primary.decimals)?;
        let request = TriangleTradeRequest::cycle(
            pool_ids,
            [tokens[0].address, tokens[1].address, tokens[2].address],
            scaled.start,
            FundManagement::wallet(self.ctx.signer()),
        );

        let result = self
            .evaluate_profit(&request.clone().into(), scaled.step, retry, label)
            .await;

        if !result.meets_min_profit(scaled.min_profit) {
            self.ctx
                .events
                .trade_skipped(Self::NAME, label, &result, &definition.min_profit.to_string())
                .await;
            return Ok(PairOutcome::Skipped(result));
        }

        let profit_display = from_base_units(result.best_profit, primary.decimals).unwrap_or_default();
        info!(
            target: TARGET_STRATEGY,
            "Expected: Pair {} has profit {} {}", label, profit_display, primary.symbol
        );

        let trade_request = TradeRequest::Triangle(request.with_input_amount(result.best_amount));
        match self.trade(&trade_request).await {
            Ok(tx_hash) => {
                let record = self
                    .ctx
                    .record(Self::NAME, label, result.best_profit, tx_hash, primary)
                    .await;
                Ok(PairOutcome::Traded(record))
            }
            Err(e) => {
                let message = e.to_string();
                self.ctx.events.trade_failed(Self::NAME, label, &message).await;
                Ok(PairOutcome::TradeFailed(message))
            }
        }
    }

    async fn evaluate_profit(&self, request: &TradeRequest, step: U256, retry: usize, label: &str) -> ProfitResult {
        let TradeRequest::Triangle(triangle) = request else {
            debug!(target: TARGET_STRATEGY, "[{}] 忽略 {} 请求", Self::NAME, request.kind_name());
            return ProfitResult::unprofitable(request.amount());
        };

        let probe = BatchSwapProbe {
            pools: self.ctx.pools.as_ref(),
            request: triangle,
        };
        ProfitSearch::new(triangle.input_amount(), step, retry)
            .run(&probe, self.ctx.events.as_ref(), Self::NAME, label)
            .await
    }

    async fn trade(&self, request: &TradeRequest) -> Result<H256, ArbitrageError> {
        let TradeRequest::Triangle(triangle) = request else {
            return Err(ArbitrageError::UnsupportedRequest {
                strategy: Self::NAME,
                request: request.kind_name(),
            });
        };

        // 首个资产最多付出试探金额，其余资产接受任意非负收入
        let limits = triangle.limits().ok_or_else(|| {
            ArbitrageError::TradeSubmission(dex::DexError::InvalidResponse(format!(
                "amount {} exceeds int256",
                triangle.input_amount()
            )))
        })?;

        let call_data = self
            .ctx
            .pools
            .encode_batch_swap(triangle, &limits, U256::from(NO_DEADLINE))
            .map_err(ArbitrageError::TradeSubmission)?;
        self.ctx.submit(call_data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_deltas_are_negated() {
        let assets = [Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3)];
        let deltas = [I256::from(-120), I256::from(30), I256::from(90)];

        let gains = vault_deltas_to_gains(&assets, &deltas);

        assert_eq!(gains[&assets[0]], I256::from(120));
        assert_eq!(gains[&assets[1]], I256::from(-30));
        assert_eq!(gains[&assets[2]], I256::from(-90));
        assert_eq!(crate::profit_search::aggregate(gains.values()), Some(I256::zero()));
    }

    #[test]
    fn test_repeated_asset_is_summed() {
        let asset = Address::repeat_byte(1);
        let gains = vault_deltas_to_gains(&[asset, asset], &[I256::from(-5), I256::from(2)]);
        assert_eq!(gains[&asset], I256::from(3));
    }
}
