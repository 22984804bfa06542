use ethers::types::{Address, I256, U256};
use std::collections::BTreeMap;

/// 每个资产的结算差额 (已换算为收益方向: 正数为获得)
pub type AssetDeltas = BTreeMap<Address, I256>;

/// 单次试探结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitProbe {
    pub try_amount: U256,
    pub per_asset_delta: AssetDeltas,
    pub aggregate_profit: I256,
}

/// 网格搜索的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitResult {
    /// 最佳金额，总是某次试探的原始金额
    pub best_amount: U256,
    pub best_profit: I256,
    pub per_asset_delta: AssetDeltas,
    pub is_profitable: bool,
    /// 执行的试探次数
    pub probes_total: usize,
    /// 失败 (revert / 网络错误) 的试探次数
    pub probes_failed: usize,
}

impl ProfitResult {
    /// 没有任何候选时的结果: 原样返回起始金额，利润为 0
    pub fn unprofitable(start_amount: U256) -> Self {
        Self {
            best_amount: start_amount,
            best_profit: I256::zero(),
            per_asset_delta: AssetDeltas::new(),
            is_profitable: false,
            probes_total: 0,
            probes_failed: 0,
        }
    }

    /// 某个资产在最佳试探中的收益
    pub fn asset_profit(&self, asset: &Address) -> I256 {
        self.per_asset_delta.get(asset).copied().unwrap_or_else(I256::zero)
    }

    /// 交易门槛: 有利润且利润 >= 最小利润 (包含等于)
    pub fn meets_min_profit(&self, min_profit: I256) -> bool {
        self.is_profitable && self.best_profit >= min_profit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_profit(profit: i64) -> ProfitResult {
        ProfitResult {
            best_amount: U256::from(150),
            best_profit: I256::from(profit),
            per_asset_delta: AssetDeltas::new(),
            is_profitable: profit > 0,
            probes_total: 3,
            probes_failed: 0,
        }
    }

    #[test]
    fn test_min_profit_gate_is_inclusive() {
        let min = I256::from(1_000);

        assert!(result_with_profit(1_000).meets_min_profit(min));
        assert!(!result_with_profit(999).meets_min_profit(min));
        assert!(result_with_profit(1_001).meets_min_profit(min));
    }

    #[test]
    fn test_gate_requires_profitability() {
        // 利润为 0 时即使最小利润为 0 也不交易
        assert!(!result_with_profit(0).meets_min_profit(I256::zero()));
        assert!(!ProfitResult::unprofitable(U256::from(100)).meets_min_profit(I256::from(-1)));
    }

    #[test]
    fn test_asset_profit_defaults_to_zero() {
        let mut result = result_with_profit(5);
        result.per_asset_delta.insert(Address::repeat_byte(1), I256::from(5));

        assert_eq!(result.asset_profit(&Address::repeat_byte(1)), I256::from(5));
        assert_eq!(result.asset_profit(&Address::repeat_byte(2)), I256::zero());
    }
}
