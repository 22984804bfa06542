use ethers::types::H256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 套利定义的通用接口 (两池 / 三池)
pub trait ArbitrageDefinition: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// 日志与记录使用的标签，即配置中的 symbols 字段
    fn label(&self) -> &str;

    /// 拆分后的代币符号
    fn symbol_list(&self) -> Vec<&str> {
        self.label().split('-').map(str::trim).collect()
    }

    fn min_profit(&self) -> Decimal;
    fn min_amount(&self) -> Decimal;
    fn milestone(&self) -> Decimal;
    fn pool_ids(&self) -> &[H256];
}

/// 两池闪电互换配置
///
/// 例如 `WETH-USDC` 在两个不同的池子之间来回兑换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairDefinition {
    /// "X-Y"
    pub symbols: String,
    /// 最小利润 (以第一个代币计价)
    pub min_profit: Decimal,
    /// 起始试探金额
    pub min_amount: Decimal,
    /// 每次试探的递增步长
    pub milestone: Decimal,
    pub pool_ids: Vec<H256>,
}

impl ArbitrageDefinition for PairDefinition {
    fn label(&self) -> &str {
        &self.symbols
    }

    fn min_profit(&self) -> Decimal {
        self.min_profit
    }

    fn min_amount(&self) -> Decimal {
        self.min_amount
    }

    fn milestone(&self) -> Decimal {
        self.milestone
    }

    fn pool_ids(&self) -> &[H256] {
        &self.pool_ids
    }
}

/// 三池循环批量兑换配置 (token1 -> token2 -> token3 -> token1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriangleDefinition {
    /// "X-Y-Z"
    pub symbols: String,
    pub min_profit: Decimal,
    pub min_amount: Decimal,
    pub milestone: Decimal,
    /// 第 i 个池子负责输出第 i 个代币
    #[serde(alias = "pairs")]
    pub pools: Vec<H256>,
}

impl ArbitrageDefinition for TriangleDefinition {
    fn label(&self) -> &str {
        &self.symbols
    }

    fn min_profit(&self) -> Decimal {
        self.min_profit
    }

    fn min_amount(&self) -> Decimal {
        self.min_amount
    }

    fn milestone(&self) -> Decimal {
        self.milestone
    }

    fn pool_ids(&self) -> &[H256] {
        &self.pools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pair_definition_from_json() {
        let json = format!(
            r#"{{"symbols":"WETH-USDC","minProfit":"0.001","minAmount":1,"milestone":"0.5","poolIds":["{:?}","{:?}"]}}"#,
            H256::repeat_byte(1),
            H256::repeat_byte(2)
        );
        let def: PairDefinition = serde_json::from_str(&json).unwrap();

        assert_eq!(def.label(), "WETH-USDC");
        assert_eq!(def.symbol_list(), vec!["WETH", "USDC"]);
        assert_eq!(def.min_profit, dec!(0.001));
        assert_eq!(def.min_amount, dec!(1));
        assert_eq!(def.pool_ids().len(), 2);
    }

    #[test]
    fn test_triangle_accepts_pairs_alias() {
        let json = format!(
            r#"{{"symbols":"A-B-C","minProfit":"1","minAmount":"10","milestone":"5","pairs":["{:?}","{:?}","{:?}"]}}"#,
            H256::repeat_byte(1),
            H256::repeat_byte(2),
            H256::repeat_byte(3)
        );
        let def: TriangleDefinition = serde_json::from_str(&json).unwrap();

        assert_eq!(def.symbol_list(), vec!["A", "B", "C"]);
        assert_eq!(def.pools[2], H256::repeat_byte(3));
    }
}
