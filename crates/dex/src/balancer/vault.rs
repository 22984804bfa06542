use async_trait::async_trait;
use dashmap::DashMap;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use models::{
    AssetDeltas, FundManagement, PairTradeRequest, PoolToken, SwapKind, TriangleTradeRequest, TxReceiptSummary,
    VaultPool,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use ::utils::TARGET_TRADE;

use super::contracts::{self, BalancerVault, Erc20Token};
use crate::common::{ChainClient, DexError, PoolProvider};
use crate::revert_decoder::{DecodedRevertError, RevertDecoder, RevertErrorType};

const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// 连续多少次查不到交易视为被丢弃
const DROPPED_AFTER_MISSES: u32 = 3;

/// revert 原因的展示文本，价格相关的 Balancer 错误标记为可重试
fn describe_revert(decoded: &DecodedRevertError) -> String {
    if decoded.is_retryable {
        debug!(target: TARGET_TRADE, "可重试的 revert: {}", decoded);
        return format!("{} [可重试]", decoded);
    }
    if decoded.error_type == RevertErrorType::EmptyRevert {
        warn!(target: TARGET_TRADE, "⚠️  空 revert，可能是 gas 不足或合约不存在");
    }
    decoded.to_string()
}

/// 把合约调用错误翻译成可读的 revert 原因
fn contract_error<M: Middleware>(err: ContractError<M>) -> DexError {
    let decoded = match err.as_revert() {
        Some(data) => RevertDecoder::decode_revert_data(data),
        None => RevertDecoder::decode_from_error_string(&err.to_string()),
    };
    DexError::Contract(describe_revert(&decoded))
}

/// Vault 视角的正数是用户付出，取反得到用户收益
fn vault_deltas_to_user(assets: &[Address], deltas: Vec<I256>) -> AssetDeltas {
    assets
        .iter()
        .zip(deltas)
        .map(|(asset, delta)| (*asset, I256::zero().saturating_sub(delta)))
        .collect()
}

/// Balancer V2 Vault 客户端
///
/// 同时负责池子查询、兑换模拟以及签名钱包的授权和提交
pub struct BalancerVaultClient<M: Middleware> {
    provider: Arc<M>,
    vault: BalancerVault<M>,
    signer: Address,
    confirmations: usize,
    confirmation_timeout: Duration,
    /// 代币 symbol / decimals 缓存
    token_cache: DashMap<Address, PoolToken>,
}

impl<M: Middleware + 'static> BalancerVaultClient<M> {
    pub fn new(provider: Arc<M>, vault_address: Address, signer: Address) -> Self {
        Self {
            vault: BalancerVault::new(vault_address, provider.clone()),
            provider,
            signer,
            confirmations: 1,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            token_cache: DashMap::new(),
        }
    }

    /// 设置确认数与确认超时
    pub fn with_confirmations(mut self, confirmations: usize, timeout: Duration) -> Self {
        self.confirmations = confirmations.max(1);
        self.confirmation_timeout = timeout;
        self
    }

    pub fn vault_address(&self) -> Address {
        self.vault.address()
    }

    /// 获取代币元数据 (带缓存)
    async fn token_metadata(&self, token: Address) -> Result<PoolToken, DexError> {
        if let Some(cached) = self.token_cache.get(&token) {
            return Ok(cached.clone());
        }

        let metadata = if token.is_zero() {
            PoolToken::new("ETH", token, 18)
        } else {
            let erc20 = Erc20Token::new(token, self.provider.clone());
            let symbol = erc20.symbol().call().await.map_err(contract_error)?;
            let decimals = erc20.decimals().call().await.map_err(contract_error)?;
            PoolToken::new(symbol, token, decimals)
        };

        debug!("代币元数据: {:?} {} ({} 位)", token, metadata.symbol, metadata.decimals);
        self.token_cache.insert(token, metadata.clone());
        Ok(metadata)
    }

    async fn query_deltas(
        &self,
        kind: SwapKind,
        steps: &[models::BatchSwapStep],
        assets: &[Address],
        funds: &FundManagement,
    ) -> Result<Vec<I256>, DexError> {
        let deltas = self
            .vault
            .query_batch_swap(
                kind.as_u8(),
                steps.iter().map(contracts::BatchSwapStep::from).collect(),
                assets.to_vec(),
                contracts::FundManagement::from(funds),
            )
            .call()
            .await
            .map_err(contract_error)?;

        if deltas.len() != assets.len() {
            return Err(DexError::InvalidResponse(format!(
                "queryBatchSwap returned {} deltas for {} assets",
                deltas.len(),
                assets.len()
            )));
        }
        Ok(deltas)
    }

    /// 发送交易并等待确认
    async fn send(&self, tx: TypedTransaction) -> Result<TxReceiptSummary, DexError> {
        let pending = self.provider.send_transaction(tx, None).await.map_err(|e| {
            let decoded = RevertDecoder::decode_from_error_string(&e.to_string());
            DexError::Provider(describe_revert(&decoded))
        })?;
        let tx_hash = pending.tx_hash();
        info!(target: TARGET_TRADE, "📤 交易已发送: {:?}", tx_hash);

        self.wait_for_confirmation(tx_hash).await
    }

    /// 轮询交易回执直到达到确认数或超时
    async fn wait_for_confirmation(&self, tx_hash: H256) -> Result<TxReceiptSummary, DexError> {
        let start = Instant::now();
        let mut misses = 0u32;

        loop {
            if start.elapsed() > self.confirmation_timeout {
                error!(target: TARGET_TRADE, "⏰ 等待交易确认超时: {:?}", tx_hash);
                return Err(DexError::ConfirmationTimeout(tx_hash));
            }

            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if receipt.status != Some(U64::from(1)) {
                        error!(target: TARGET_TRADE, "❌ 交易 Revert: {:?} | Block: {:?}", tx_hash, receipt.block_number);
                        return Err(DexError::Reverted(tx_hash));
                    }

                    let mined_at = receipt.block_number.map(|n| n.as_u64());
                    if let (Some(mined), true) = (mined_at, self.confirmations > 1) {
                        let current = match self.provider.get_block_number().await {
                            Ok(n) => n.as_u64(),
                            Err(e) => {
                                warn!(target: TARGET_TRADE, "获取区块高度失败: {}", e);
                                mined
                            }
                        };
                        if current + 1 < mined + self.confirmations as u64 {
                            debug!(target: TARGET_TRADE, "等待更多确认: {:?} ({}/{})", tx_hash, current + 1 - mined, self.confirmations);
                            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
                            continue;
                        }
                    }

                    info!(target: TARGET_TRADE, "✅ 交易确认成功: {:?} | Block: {:?}", tx_hash, mined_at);
                    return Ok(TxReceiptSummary {
                        tx_hash,
                        block_number: mined_at,
                        gas_used: receipt.gas_used,
                        success: true,
                    });
                }
                Ok(None) => {
                    debug!(target: TARGET_TRADE, "等待交易确认: {:?}", tx_hash);
                    if let Ok(None) = self.provider.get_transaction(tx_hash).await {
                        misses += 1;
                        if misses >= DROPPED_AFTER_MISSES {
                            error!(target: TARGET_TRADE, "❌ 交易已从内存池消失: {:?}", tx_hash);
                            return Err(DexError::Dropped(tx_hash));
                        }
                    } else {
                        misses = 0;
                    }
                }
                Err(e) => {
                    warn!(target: TARGET_TRADE, "获取交易回执失败: {}", e);
                }
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> PoolProvider for BalancerVaultClient<M> {
    async fn find_pool(&self, pool_id: H256) -> Result<VaultPool, DexError> {
        let (address, _specialization) = self.vault.get_pool(pool_id.0).call().await.map_err(|e| {
            match contract_error(e) {
                // BAL#500 INVALID_POOL_ID
                DexError::Contract(msg) if msg.starts_with("BAL#500") => DexError::PoolNotFound(pool_id),
                other => other,
            }
        })?;
        if address.is_zero() {
            return Err(DexError::PoolNotFound(pool_id));
        }

        let (token_addresses, _balances, _last_change_block) =
            self.vault.get_pool_tokens(pool_id.0).call().await.map_err(contract_error)?;

        let mut tokens = Vec::with_capacity(token_addresses.len());
        for token in token_addresses {
            tokens.push(self.token_metadata(token).await?);
        }

        Ok(VaultPool::new(pool_id, address, tokens))
    }

    async fn query_flash_swap(&self, request: &PairTradeRequest) -> Result<AssetDeltas, DexError> {
        let steps = contracts::flash_swap_steps(request);
        let funds = FundManagement::wallet(self.signer);
        let deltas = self.query_deltas(SwapKind::GivenIn, &steps, &request.assets, &funds).await?;

        Ok(vault_deltas_to_user(&request.assets, deltas))
    }

    async fn query_batch_swap(&self, request: &TriangleTradeRequest) -> Result<Vec<I256>, DexError> {
        self.query_deltas(request.kind, &request.swaps, &request.assets, &request.funds)
            .await
    }

    fn encode_flash_swap(&self, request: &PairTradeRequest, wallet: Address) -> Result<Bytes, DexError> {
        Ok(contracts::encode_batch_swap_call(
            SwapKind::GivenIn,
            &contracts::flash_swap_steps(request),
            &request.assets,
            &FundManagement::wallet(wallet),
            &[I256::zero(), I256::zero()],
            U256::from(contracts::NO_DEADLINE),
        ))
    }

    fn encode_batch_swap(
        &self,
        request: &TriangleTradeRequest,
        limits: &[I256],
        deadline: U256,
    ) -> Result<Bytes, DexError> {
        if limits.len() != request.assets.len() {
            return Err(DexError::InvalidResponse(format!(
                "{} limits for {} assets",
                limits.len(),
                request.assets.len()
            )));
        }

        Ok(contracts::encode_batch_swap_call(
            request.kind,
            &request.swaps,
            &request.assets,
            &request.funds,
            limits,
            deadline,
        ))
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainClient for BalancerVaultClient<M> {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256, DexError> {
        Erc20Token::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxReceiptSummary, DexError> {
        info!(target: TARGET_TRADE, "🔓 授权代币 {:?} 给 {:?}", token, spender);

        let call = Erc20Token::new(token, self.provider.clone())
            .approve(spender, amount)
            .from(self.signer);
        let gas = call.estimate_gas().await.map_err(contract_error)?;
        let call = call.gas(gas);
        self.send(call.tx).await
    }

    async fn submit(&self, to: Address, data: Bytes) -> Result<TxReceiptSummary, DexError> {
        let tx = TransactionRequest::new().from(self.signer).to(to).data(data);
        self.send(tx.into()).await
    }
}
