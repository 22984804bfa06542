use async_trait::async_trait;
use config_crate::DefinitionSet;
use ethers::types::{H256, I256, U256};
use models::units::{to_base_units, to_signed_base_units};
use models::{ArbitrageDefinition, ProfitResult, TradeRecord, TradeRequest, UnitsError};

use crate::context::StrategyContext;
use crate::error::ArbitrageError;

/// 单个套利对的处理结果
#[derive(Debug, Clone)]
pub enum PairOutcome {
    /// 利润不足，未下单
    Skipped(ProfitResult),
    Traded(TradeRecord),
    /// 下单失败，下一轮重新评估
    TradeFailed(String),
}

/// 套利策略
///
/// 引擎只依赖这个接口，不区分具体策略
#[async_trait]
pub trait ArbitrageStrategy: Send + Sync + 'static {
    type Definition: ArbitrageDefinition;

    fn name(&self) -> &'static str;

    fn context(&self) -> &StrategyContext;

    /// 当前配置的套利对 (每轮重新读取)
    async fn list_pairs(&self) -> Result<DefinitionSet<Self::Definition>, ArbitrageError>;

    /// 查询池子、授权、搜索最优金额并决定是否下单
    ///
    /// 调用方负责持有策略锁
    async fn handle_pair(&self, definition: &Self::Definition, retry: usize) -> Result<PairOutcome, ArbitrageError>;

    /// 从请求中的金额开始按 `step` 递增试探 `retry` 次
    async fn evaluate_profit(&self, request: &TradeRequest, step: U256, retry: usize, label: &str) -> ProfitResult;

    /// 按请求中的金额编码并发送交易
    async fn trade(&self, request: &TradeRequest) -> Result<H256, ArbitrageError>;
}

/// 换算成主代币最小单位的定义参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledAmounts {
    /// 起始试探金额 (minAmount)
    pub start: U256,
    /// 试探步长 (milestone)
    pub step: U256,
    pub min_profit: I256,
}

impl ScaledAmounts {
    pub fn from_definition<D: ArbitrageDefinition>(definition: &D, decimals: u8) -> Result<Self, UnitsError> {
        Ok(Self {
            start: to_base_units(definition.min_amount(), decimals)?,
            step: to_base_units(definition.milestone(), decimals)?,
            min_profit: to_signed_base_units(definition.min_profit(), decimals)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::PairDefinition;
    use rust_decimal_macros::dec;

    #[test]
    fn test_scaled_amounts() {
        let def = PairDefinition {
            symbols: "WETH-USDC".to_string(),
            min_profit: dec!(0.5),
            min_amount: dec!(100),
            milestone: dec!(50),
            pool_ids: vec![H256::repeat_byte(1), H256::repeat_byte(2)],
        };

        let scaled = ScaledAmounts::from_definition(&def, 6).unwrap();
        assert_eq!(scaled.start, U256::from(100_000_000u64));
        assert_eq!(scaled.step, U256::from(50_000_000u64));
        assert_eq!(scaled.min_profit, I256::from(500_000));

        let negative = PairDefinition {
            min_amount: dec!(-1),
            ..def
        };
        assert!(ScaledAmounts::from_definition(&negative, 6).is_err());
    }
}
