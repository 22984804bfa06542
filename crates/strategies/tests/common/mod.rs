#![allow(dead_code)]

use async_trait::async_trait;
use config_crate::{ArbitrageDefinitions, DefinitionSet, StaticDefinitions};
use dex::{ChainClient, DexError, PoolProvider};
use ethers::types::{Address, Bytes, H256, I256, U256};
use models::{
    AssetDeltas, PairDefinition, PairTradeRequest, PoolToken, ProfitResult, TradeRecord, TriangleDefinition,
    TriangleTradeRequest, TxReceiptSummary, VaultPool,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use services::ArbitrageEventSink;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strategies::StrategyContext;

pub const VAULT: Address = Address::repeat_byte(0xba);
pub const SIGNER: Address = Address::repeat_byte(0xee);

pub fn pool_id(n: u8) -> H256 {
    H256::repeat_byte(n)
}

pub fn token(symbol: &str, byte: u8, decimals: u8) -> PoolToken {
    PoolToken::new(symbol, Address::repeat_byte(byte), decimals)
}

pub fn pool(id: u8, tokens: Vec<PoolToken>) -> VaultPool {
    VaultPool::new(pool_id(id), Address::repeat_byte(id), tokens)
}

pub fn pair_definition(symbols: &str, min_profit: Decimal, min_amount: Decimal, milestone: Decimal, pools: [u8; 2]) -> PairDefinition {
    PairDefinition {
        symbols: symbols.to_string(),
        min_profit,
        min_amount,
        milestone,
        pool_ids: pools.iter().map(|id| pool_id(*id)).collect(),
    }
}

pub fn triangle_definition(
    symbols: &str,
    min_profit: Decimal,
    min_amount: Decimal,
    milestone: Decimal,
    pools: [u8; 3],
) -> TriangleDefinition {
    TriangleDefinition {
        symbols: symbols.to_string(),
        min_profit,
        min_amount,
        milestone,
        pools: pools.iter().map(|id| pool_id(*id)).collect(),
    }
}

pub fn pair_definitions(retry: usize, pairs: Vec<PairDefinition>) -> ArbitrageDefinitions {
    ArbitrageDefinitions {
        pair: DefinitionSet::new(retry, pairs),
        ..Default::default()
    }
}

pub fn triangle_definitions(retry: usize, pairs: Vec<TriangleDefinition>) -> ArbitrageDefinitions {
    ArbitrageDefinitions {
        triangle: DefinitionSet::new(retry, pairs),
        ..Default::default()
    }
}

/// 内存中的 Vault：池子、模拟结果与链上操作都由测试预设
#[derive(Default)]
pub struct MockVault {
    pools: Mutex<HashMap<H256, VaultPool>>,
    /// 金额 -> 第一个资产的收益；未配置的金额模拟失败
    flash_profits: Mutex<HashMap<U256, I256>>,
    /// 金额 -> Vault 视角的净变化
    batch_deltas: Mutex<HashMap<U256, Vec<I256>>>,
    allowances: Mutex<HashMap<Address, U256>>,
    probe_delay: Mutex<Option<Duration>>,
    fail_submit: AtomicBool,

    pub probed_amounts: Mutex<Vec<U256>>,
    pub allowance_queries: Mutex<Vec<Address>>,
    pub approvals: Mutex<Vec<(Address, Address, U256)>>,
    pub flash_encoded: Mutex<Vec<(PairTradeRequest, Address)>>,
    pub batch_encoded: Mutex<Vec<(TriangleTradeRequest, Vec<I256>, U256)>>,
    pub submissions: Mutex<Vec<(Address, Bytes)>>,

    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(self, pool: VaultPool) -> Self {
        self.pools.lock().insert(pool.id, pool);
        self
    }

    pub fn with_flash_profit(self, amount: u64, profit: i64) -> Self {
        self.set_flash_profit(amount, profit);
        self
    }

    pub fn set_flash_profit(&self, amount: u64, profit: i64) {
        self.flash_profits.lock().insert(U256::from(amount), I256::from(profit));
    }

    pub fn with_batch_deltas(self, amount: u64, deltas: [i64; 3]) -> Self {
        self.batch_deltas
            .lock()
            .insert(U256::from(amount), deltas.iter().map(|d| I256::from(*d)).collect());
        self
    }

    pub fn with_allowance(self, token: Address, amount: U256) -> Self {
        self.allowances.lock().insert(token, amount);
        self
    }

    pub fn with_probe_delay(self, delay: Duration) -> Self {
        *self.probe_delay.lock() = Some(delay);
        self
    }

    pub fn fail_submissions(&self) {
        self.fail_submit.store(true, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> usize {
        self.probed_amounts.lock().len()
    }

    pub fn reset_overlap(&self) {
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    async fn enter_probe(&self, amount: U256) {
        self.probed_amounts.lock().push(amount);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.probe_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PoolProvider for MockVault {
    async fn find_pool(&self, pool_id: H256) -> Result<VaultPool, DexError> {
        self.pools
            .lock()
            .get(&pool_id)
            .cloned()
            .ok_or(DexError::PoolNotFound(pool_id))
    }

    async fn query_flash_swap(&self, request: &PairTradeRequest) -> Result<AssetDeltas, DexError> {
        self.enter_probe(request.amount).await;

        let profit = self.flash_profits.lock().get(&request.amount).copied();
        match profit {
            Some(profit) => Ok([(request.assets[0], profit), (request.assets[1], I256::zero())]
                .into_iter()
                .collect()),
            None => Err(DexError::Contract("BAL#304 (MAX_IN_RATIO)".to_string())),
        }
    }

    async fn query_batch_swap(&self, request: &TriangleTradeRequest) -> Result<Vec<I256>, DexError> {
        let amount = request.input_amount();
        self.enter_probe(amount).await;

        let deltas = self.batch_deltas.lock().get(&amount).cloned();
        deltas.ok_or_else(|| DexError::Contract("BAL#507 (SWAP_LIMIT)".to_string()))
    }

    fn encode_flash_swap(&self, request: &PairTradeRequest, wallet: Address) -> Result<Bytes, DexError> {
        self.flash_encoded.lock().push((request.clone(), wallet));
        Ok(Bytes::from(vec![0xf1]))
    }

    fn encode_batch_swap(&self, request: &TriangleTradeRequest, limits: &[I256], deadline: U256) -> Result<Bytes, DexError> {
        self.batch_encoded
            .lock()
            .push((request.clone(), limits.to_vec(), deadline));
        Ok(Bytes::from(vec![0xb5]))
    }
}

#[async_trait]
impl ChainClient for MockVault {
    fn signer_address(&self) -> Address {
        SIGNER
    }

    async fn allowance(&self, token: Address, _owner: Address, _spender: Address) -> Result<U256, DexError> {
        self.allowance_queries.lock().push(token);
        Ok(self.allowances.lock().get(&token).copied().unwrap_or(U256::MAX))
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxReceiptSummary, DexError> {
        self.approvals.lock().push((token, spender, amount));
        self.allowances.lock().insert(token, amount);
        Ok(TxReceiptSummary {
            tx_hash: H256::repeat_byte(0xaa),
            block_number: Some(1),
            gas_used: Some(U256::from(46_000)),
            success: true,
        })
    }

    async fn submit(&self, to: Address, data: Bytes) -> Result<TxReceiptSummary, DexError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(DexError::Reverted(H256::repeat_byte(0xdd)));
        }

        let mut submissions = self.submissions.lock();
        submissions.push((to, data));
        Ok(TxReceiptSummary {
            tx_hash: H256::from_low_u64_be(submissions.len() as u64),
            block_number: Some(2),
            gas_used: Some(U256::from(180_000)),
            success: true,
        })
    }
}

#[derive(Debug, Clone)]
pub enum SinkEvent {
    ProbeFailed { label: String, amount: U256 },
    Skipped { label: String, result: ProfitResult },
    Succeeded(TradeRecord),
    TradeFailed { label: String, error: String },
    PairFailed { label: String, error: String },
}

#[derive(Default)]
pub struct CollectingSink {
    pub events: Mutex<Vec<SinkEvent>>,
}

impl CollectingSink {
    pub fn trades(&self) -> Vec<TradeRecord> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Succeeded(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<(String, ProfitResult)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Skipped { label, result } => Some((label.clone(), result.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn pair_failures(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::PairFailed { label, error } => Some((label.clone(), error.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn handled_labels(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Skipped { label, .. }
                | SinkEvent::TradeFailed { label, .. }
                | SinkEvent::PairFailed { label, .. } => Some(label.clone()),
                SinkEvent::Succeeded(record) => Some(record.pair.clone()),
                SinkEvent::ProbeFailed { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ArbitrageEventSink for CollectingSink {
    async fn probe_failed(&self, _strategy: &str, label: &str, amount: U256, _error: &str) {
        self.events.lock().push(SinkEvent::ProbeFailed {
            label: label.to_string(),
            amount,
        });
    }

    async fn trade_skipped(&self, _strategy: &str, label: &str, result: &ProfitResult, _min_profit: &str) {
        self.events.lock().push(SinkEvent::Skipped {
            label: label.to_string(),
            result: result.clone(),
        });
    }

    async fn trade_succeeded(&self, record: &TradeRecord) {
        self.events.lock().push(SinkEvent::Succeeded(record.clone()));
    }

    async fn trade_failed(&self, _strategy: &str, label: &str, error: &str) {
        self.events.lock().push(SinkEvent::TradeFailed {
            label: label.to_string(),
            error: error.to_string(),
        });
    }

    async fn pair_failed(&self, _strategy: &str, label: &str, error: &str) {
        self.events.lock().push(SinkEvent::PairFailed {
            label: label.to_string(),
            error: error.to_string(),
        });
    }
}

pub struct Harness {
    pub vault: Arc<MockVault>,
    pub sink: Arc<CollectingSink>,
    pub definitions: Arc<StaticDefinitions>,
    pub ctx: StrategyContext,
}

pub fn harness(vault: MockVault, definitions: ArbitrageDefinitions) -> Harness {
    let vault = Arc::new(vault);
    let sink = Arc::new(CollectingSink::default());
    let definitions = Arc::new(StaticDefinitions::new(definitions));
    let ctx = StrategyContext::new(vault.clone(), vault.clone(), sink.clone(), definitions.clone(), VAULT);

    Harness {
        vault,
        sink,
        definitions,
        ctx,
    }
}

/// 轮询直到条件成立，超时则测试失败
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
