use ethers::types::{Address, Bytes, H256, I256, U256};
use serde::{Deserialize, Serialize};

/// Balancer 批量兑换模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapKind {
    /// 精确输入
    GivenIn = 0,
    /// 精确输出
    GivenOut = 1,
}

impl SwapKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 批量兑换中的单个步骤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSwapStep {
    pub pool_id: H256,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    /// 为 0 时由上一步的输出决定
    pub amount: U256,
    pub user_data: Bytes,
}

impl BatchSwapStep {
    pub fn new(pool_id: H256, asset_in_index: usize, asset_out_index: usize, amount: U256) -> Self {
        Self {
            pool_id,
            asset_in_index,
            asset_out_index,
            amount,
            user_data: Bytes::new(),
        }
    }
}

/// Vault 资金来源与去向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundManagement {
    pub sender: Address,
    pub from_internal_balance: bool,
    pub recipient: Address,
    pub to_internal_balance: bool,
}

impl FundManagement {
    /// 资金由钱包直接支付并直接返还钱包 (不使用 Vault 内部余额)
    pub fn wallet(address: Address) -> Self {
        Self {
            sender: address,
            from_internal_balance: false,
            recipient: address,
            to_internal_balance: false,
        }
    }
}

/// 两池闪电互换请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairTradeRequest {
    pub pool_ids: [H256; 2],
    pub assets: [Address; 2],
    /// 闪电借入金额 (第一个代币的最小单位)
    pub amount: U256,
}

impl PairTradeRequest {
    pub fn with_amount(&self, amount: U256) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }
}

/// 三池循环批量兑换请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleTradeRequest {
    pub kind: SwapKind,
    pub swaps: Vec<BatchSwapStep>,
    pub assets: [Address; 3],
    pub funds: FundManagement,
}

impl TriangleTradeRequest {
    /// 构建 asset0 -> asset1 -> asset2 -> asset0 的循环
    ///
    /// 只有第一步携带金额，后两步为 0 (由批量结算传递)
    pub fn cycle(pool_ids: [H256; 3], assets: [Address; 3], amount: U256, funds: FundManagement) -> Self {
        let swaps = vec![
            BatchSwapStep::new(pool_ids[0], 0, 1, amount),
            BatchSwapStep::new(pool_ids[1], 1, 2, U256::zero()),
            BatchSwapStep::new(pool_ids[2], 2, 0, U256::zero()),
        ];

        Self {
            kind: SwapKind::GivenIn,
            swaps,
            assets,
            funds,
        }
    }

    pub fn input_amount(&self) -> U256 {
        self.swaps.first().map(|s| s.amount).unwrap_or_default()
    }

    /// 只修改第一步的输入金额
    pub fn with_input_amount(&self, amount: U256) -> Self {
        let mut request = self.clone();
        if let Some(first) = request.swaps.first_mut() {
            first.amount = amount;
        }
        request
    }

    /// 正数为最多付出，0 为接受任意非负收入
    ///
    /// 金额超出 int256 范围时返回 None
    pub fn limits(&self) -> Option<[I256; 3]> {
        let max_in = I256::try_from(self.input_amount()).ok()?;
        Some([max_in, I256::zero(), I256::zero()])
    }
}

/// 交易请求 (按策略区分)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeRequest {
    Pair(PairTradeRequest),
    Triangle(TriangleTradeRequest),
}

impl TradeRequest {
    /// 当前试探 / 交易金额
    pub fn amount(&self) -> U256 {
        match self {
            TradeRequest::Pair(req) => req.amount,
            TradeRequest::Triangle(req) => req.input_amount(),
        }
    }

    pub fn with_amount(&self, amount: U256) -> Self {
        match self {
            TradeRequest::Pair(req) => TradeRequest::Pair(req.with_amount(amount)),
            TradeRequest::Triangle(req) => TradeRequest::Triangle(req.with_input_amount(amount)),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TradeRequest::Pair(_) => "pair",
            TradeRequest::Triangle(_) => "triangle",
        }
    }
}

impl From<PairTradeRequest> for TradeRequest {
    fn from(req: PairTradeRequest) -> Self {
        TradeRequest::Pair(req)
    }
}

impl From<TriangleTradeRequest> for TradeRequest {
    fn from(req: TriangleTradeRequest) -> Self {
        TradeRequest::Triangle(req)
    }
}
