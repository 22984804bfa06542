use ethers::abi::AbiEncode;
use ethers::prelude::*;
use models::{PairTradeRequest, SwapKind};

/// 交易截止时间 (实际上永不过期)
pub const NO_DEADLINE: u64 = 999_999_999_999_999_999;

// Balancer V2 Vault ABI
abigen!(
    BalancerVault,
    r#"[
        struct BatchSwapStep { bytes32 poolId; uint256 assetInIndex; uint256 assetOutIndex; uint256 amount; bytes userData; }
        struct FundManagement { address sender; bool fromInternalBalance; address recipient; bool toInternalBalance; }
        function getPool(bytes32 poolId) external view returns (address, uint8)
        function getPoolTokens(bytes32 poolId) external view returns (address[] tokens, uint256[] balances, uint256 lastChangeBlock)
        function queryBatchSwap(uint8 kind, BatchSwapStep[] memory swaps, address[] memory assets, FundManagement memory funds) external returns (int256[] memory assetDeltas)
        function batchSwap(uint8 kind, BatchSwapStep[] memory swaps, address[] memory assets, FundManagement memory funds, int256[] memory limits, uint256 deadline) external payable returns (int256[] memory assetDeltas)
    ]"#
);

// ERC20 ABI
abigen!(
    Erc20Token,
    r#"[
        function symbol() external view returns (string)
        function decimals() external view returns (uint8)
        function allowance(address owner, address spender) external view returns (uint256)
        function approve(address spender, uint256 amount) external returns (bool)
    ]"#
);

impl From<&models::BatchSwapStep> for BatchSwapStep {
    fn from(step: &models::BatchSwapStep) -> Self {
        Self {
            pool_id: step.pool_id.0,
            asset_in_index: U256::from(step.asset_in_index),
            asset_out_index: U256::from(step.asset_out_index),
            amount: step.amount,
            user_data: step.user_data.clone(),
        }
    }
}

impl From<&models::FundManagement> for FundManagement {
    fn from(funds: &models::FundManagement) -> Self {
        Self {
            sender: funds.sender,
            from_internal_balance: funds.from_internal_balance,
            recipient: funds.recipient,
            to_internal_balance: funds.to_internal_balance,
        }
    }
}

/// 闪电互换的两步: pool0 卖出 asset0 换 asset1，pool1 再换回 asset0
///
/// 第二步金额为 0，使用第一步的全部输出
pub fn flash_swap_steps(request: &PairTradeRequest) -> Vec<models::BatchSwapStep> {
    vec![
        models::BatchSwapStep::new(request.pool_ids[0], 0, 1, request.amount),
        models::BatchSwapStep::new(request.pool_ids[1], 1, 0, U256::zero()),
    ]
}

/// batchSwap calldata
pub fn encode_batch_swap_call(
    kind: SwapKind,
    steps: &[models::BatchSwapStep],
    assets: &[Address],
    funds: &models::FundManagement,
    limits: &[I256],
    deadline: U256,
) -> Bytes {
    let call = BatchSwapCall {
        kind: kind.as_u8(),
        swaps: steps.iter().map(BatchSwapStep::from).collect(),
        assets: assets.to_vec(),
        funds: FundManagement::from(funds),
        limits: limits.to_vec(),
        deadline,
    };
    Bytes::from(call.encode())
}
