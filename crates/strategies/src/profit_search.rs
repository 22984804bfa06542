//! 网格搜索最优交易金额
//!
//! 在 `start + step * i (i = 0..retry)` 上逐个试探，全部试探完才返回，
//! 不会因为某次结果变差而提前停止 (利润曲线可能不单调)。

use async_trait::async_trait;
use ethers::types::{I256, U256};
use models::{AssetDeltas, ProfitProbe, ProfitResult};
use services::ArbitrageEventSink;
use tracing::debug;
use utils::TARGET_STRATEGY;

use crate::error::ArbitrageError;

/// 单次试探：给定金额，返回每个资产的收益 (正数为获利)
#[async_trait]
pub trait ProbeSource: Send + Sync {
    async fn probe(&self, amount: U256) -> Result<AssetDeltas, ArbitrageError>;
}

/// 各资产收益求和，溢出时返回 None
pub fn aggregate<'a>(deltas: impl IntoIterator<Item = &'a I256>) -> Option<I256> {
    deltas
        .into_iter()
        .try_fold(I256::zero(), |acc, delta| acc.checked_add(*delta))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitSearch {
    start: U256,
    step: U256,
    retry: usize,
}

impl ProfitSearch {
    pub fn new(start: U256, step: U256, retry: usize) -> Self {
        Self { start, step, retry }
    }

    /// 试探金额序列 (溢出时截止)
    pub fn amounts(&self) -> Vec<U256> {
        (0..self.retry)
            .map_while(|i| {
                self.step
                    .checked_mul(U256::from(i))
                    .and_then(|offset| self.start.checked_add(offset))
            })
            .collect()
    }

    /// 执行全部试探并返回最优结果
    ///
    /// 失败的试探只记录，不参与比较；全部失败时返回起始金额、利润 0
    pub async fn run(
        &self,
        source: &dyn ProbeSource,
        events: &dyn ArbitrageEventSink,
        strategy: &str,
        label: &str,
    ) -> ProfitResult {
        let mut result = ProfitResult::unprofitable(self.start);
        let mut best: Option<ProfitProbe> = None;

        for amount in self.amounts() {
            result.probes_total += 1;

            let probed = source.probe(amount).await.and_then(|deltas| {
                aggregate(deltas.values())
                    .map(|profit| (deltas, profit))
                    .ok_or(ArbitrageError::ProfitOverflow(amount))
            });
            let (deltas, aggregate_profit) = match probed {
                Ok(probed) => probed,
                Err(e) => {
                    result.probes_failed += 1;
                    events.probe_failed(strategy, label, amount, &e.to_string()).await;
                    continue;
                }
            };

            let probe = ProfitProbe {
                try_amount: amount,
                aggregate_profit,
                per_asset_delta: deltas,
            };
            debug!(
                target: TARGET_STRATEGY,
                "[{}] {} => amount: {} profit: {}", strategy, label, probe.try_amount, probe.aggregate_profit
            );

            let improves = best
                .as_ref()
                .map_or(true, |current| probe.aggregate_profit > current.aggregate_profit);
            if improves {
                best = Some(probe);
            }
        }

        if let Some(best) = best {
            result.best_amount = best.try_amount;
            result.best_profit = best.aggregate_profit;
            result.is_profitable = best.aggregate_profit > I256::zero();
            result.per_asset_delta = best.per_asset_delta;
        }
        result
    }
}
