//! 两池闪电互换套利
//!
//! 在 pool1 用 token0 换 token1，再在 pool2 换回 token0，
//! 两步在同一笔 batchSwap 中结算。

use async_trait::async_trait;
use config_crate::DefinitionSet;
use dex::PoolProvider;
use ethers::types::{H256, U256};
use models::units::from_base_units;
use models::{ArbitrageDefinition, AssetDeltas, PairDefinition, PairTradeRequest, ProfitResult, TradeRequest};
use tracing::{debug, info};
use utils::TARGET_STRATEGY;

use crate::context::{lookup_asset_index, StrategyContext};
use crate::error::ArbitrageError;
use crate::profit_search::{ProbeSource, ProfitSearch};
use crate::strategy::{ArbitrageStrategy, PairOutcome, ScaledAmounts};

/// 按金额模拟闪电互换
struct FlashSwapProbe<'a> {
    pools: &'a dyn PoolProvider,
    request: &'a PairTradeRequest,
}

#[async_trait]
impl<'a> ProbeSource for FlashSwapProbe<'a> {
    async fn probe(&self, amount: U256) -> Result<AssetDeltas, ArbitrageError> {
        Ok(self.pools.query_flash_swap(&self.request.with_amount(amount)).await?)
    }
}

pub struct PairArbitrage {
    ctx: StrategyContext,
}

impl PairArbitrage {
    pub const NAME: &'static str = "pair";

    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ArbitrageStrategy for PairArbitrage {
    type Definition = PairDefinition;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    async fn list_pairs(&self) -> Result<DefinitionSet<PairDefinition>, ArbitrageError> {
        Ok(self.ctx.load_definitions().await?.pair)
    }

    async fn handle_pair(&self, definition: &PairDefinition, retry: usize) -> Result<PairOutcome, ArbitrageError> {
        let label = definition.label();
        let symbols = definition.symbol_list();
        let (pool_id1, pool_id2) = match definition.pool_ids() {
            [first, second] => (*first, *second),
            ids => {
                return Err(ArbitrageError::invalid_definition(
                    label,
                    format!("expected 2 pool ids, got {}", ids.len()),
                ))
            }
        };
        if symbols.len() != 2 {
            return Err(ArbitrageError::invalid_definition(
                label,
                format!("expected 2 symbols, got {}", symbols.len()),
            ));
        }

        let pool1 = self.ctx.find_pool(pool_id1).await?;
        // 第二个池子只需确认存在，代币信息取自第一个池子
        self.ctx.find_pool(pool_id2).await?;

        let mut tokens = Vec::with_capacity(2);
        for symbol in &symbols {
            let index = lookup_asset_index(&pool1, symbol)?;
            let token = pool1
                .token(index)
                .cloned()
                .ok_or_else(|| ArbitrageError::AssetNotFound {
                    pool_id: pool1.id,
                    symbol: symbol.to_string(),
                })?;
            tokens.push(token);
        }
        let (token0, token1) = (&tokens[0], &tokens[1]);

        self.ctx.ensure_allowance(token0).await?;
        self.ctx.ensure_allowance(token1).await?;

        let scaled = ScaledAmounts::from_definition(definition, token0.decimals)?;
        let request = PairTradeRequest {
            pool_ids: [pool_id1, pool_id2],
            assets: [token0.address, token1.address],
            amount: scaled.start,
        };

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

        let profit = result.asset_profit(&token0.address);
        let profit_display = from_base_units(result.best_profit, token0.decimals).unwrap_or_default();
        info!(
            target: TARGET_STRATEGY,
            "Expected: Pair {} has profit {} {}", label, profit_display, token0.symbol
        );

        let trade_request = TradeRequest::Pair(request.with_amount(result.best_amount));
        match self.trade(&trade_request).await {
            Ok(tx_hash) => {
                let record = self.ctx.record(Self::NAME, label, profit, tx_hash, token0).await;
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
        let TradeRequest::Pair(pair) = request else {
            debug!(target: TARGET_STRATEGY, "[{}] 忽略 {} 请求", Self::NAME, request.kind_name());
            return ProfitResult::unprofitable(request.amount());
        };

        let probe = FlashSwapProbe {
            pools: self.ctx.pools.as_ref(),
            request: pair,
        };
        ProfitSearch::new(pair.amount, step, retry)
            .run(&probe, self.ctx.events.as_ref(), Self::NAME, label)
            .await
    }

    async fn trade(&self, request: &TradeRequest) -> Result<H256, ArbitrageError> {
        let TradeRequest::Pair(pair) = request else {
            return Err(ArbitrageError::UnsupportedRequest {
                strategy: Self::NAME,
                request: request.kind_name(),
            });
        };

        let call_data = self
            .ctx
            .pools
            .encode_flash_swap(pair, self.ctx.signer())
            .map_err(ArbitrageError::TradeSubmission)?;
        self.ctx.submit(call_data).await
    }
}
