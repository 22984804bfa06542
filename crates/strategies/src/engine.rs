//! 套利引擎
//!
//! 每个策略一个引擎实例，按顺序处理配置中的套利对；
//! 同一锁路径上的引擎 (包括其它进程) 互斥执行单个套利对的处理。

use async_trait::async_trait;
use config_crate::{ArbitrageConfig, DefinitionSet};
use models::ArbitrageDefinition;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use utils::TARGET_STRATEGY;

use crate::error::ArbitrageError;
use crate::lock::{FileLock, LockGuard};
use crate::strategy::{ArbitrageStrategy, PairOutcome};

/// 引擎运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Running,
    /// 已请求停止，等待当前套利对处理完
    StopRequested,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Running => "running",
            EngineState::StopRequested => "stop_requested",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub lock_path: PathBuf,
    pub lock_poll_interval: Duration,
    /// None 表示无限等待
    pub lock_wait_timeout: Option<Duration>,
    pub pass_interval: Duration,
}

impl EngineSettings {
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
            lock_poll_interval: Duration::from_millis(50),
            lock_wait_timeout: Some(Duration::from_secs(300)),
            pass_interval: Duration::ZERO,
        }
    }

    pub fn from_config(config: &ArbitrageConfig, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
            lock_poll_interval: Duration::from_millis(config.lock_poll_interval_ms.max(1)),
            lock_wait_timeout: match config.lock_wait_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            pass_interval: Duration::from_millis(config.pass_interval_ms),
        }
    }

    pub fn with_lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    pub fn with_lock_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_wait_timeout = timeout;
        self
    }

    pub fn with_pass_interval(mut self, interval: Duration) -> Self {
        self.pass_interval = interval;
        self
    }
}

#[derive(Debug, Default)]
struct EngineCounters {
    passes: AtomicU64,
    pairs_handled: AtomicU64,
    trades: AtomicU64,
    skipped: AtomicU64,
    failures: AtomicU64,
}

/// 引擎状态快照 (API 使用)
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub name: String,
    pub state: EngineState,
    pub lock_path: String,
    pub passes: u64,
    pub pairs_handled: u64,
    pub trades: u64,
    pub skipped: u64,
    pub failures: u64,
}

/// 与具体策略无关的引擎控制接口
#[async_trait]
pub trait EngineControl: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> EngineState;

    fn snapshot(&self) -> EngineSnapshot;

    /// 运行直到 stop()；已在运行时直接返回
    async fn start(&self) -> Result<(), ArbitrageError>;

    fn stop(&self);
}

pub struct ArbitrageEngine<S: ArbitrageStrategy> {
    strategy: Arc<S>,
    lock: FileLock,
    settings: EngineSettings,
    state: RwLock<EngineState>,
    counters: EngineCounters,
}

impl<S: ArbitrageStrategy> ArbitrageEngine<S> {
    pub fn new(strategy: Arc<S>, settings: EngineSettings) -> Self {
        Self {
            lock: FileLock::new(settings.lock_path.clone()),
            strategy,
            settings,
            state: RwLock::new(EngineState::Idle),
            counters: EngineCounters::default(),
        }
    }

    pub fn strategy(&self) -> &Arc<S> {
        &self.strategy
    }

    pub fn lock(&self) -> &FileLock {
        &self.lock
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    /// 启动引擎并在当前任务中运行轮询循环，直到 stop() 后本轮退出
    pub async fn start(&self) -> Result<(), ArbitrageError> {
        let name = self.strategy.name();
        {
            let mut state = self.state.write();
            if *state != EngineState::Idle {
                info!(target: TARGET_STRATEGY, "[{}] 引擎已在运行 ({})", name, *state);
                return Ok(());
            }
            // 先占住状态，并发的 start 直接返回
            *state = EngineState::Running;
        }

        let definitions = match self.initial_definitions().await {
            Ok(definitions) if !definitions.is_empty() => definitions,
            Ok(_) => {
                *self.state.write() = EngineState::Idle;
                warn!(target: TARGET_STRATEGY, "[{}] 没有配置套利对，引擎未启动", name);
                return Ok(());
            }
            Err(e) => {
                *self.state.write() = EngineState::Idle;
                return Err(e);
            }
        };

        info!(
            target: TARGET_STRATEGY,
            "🚀 [{}] 引擎启动: {} 个套利对, 试探 {} 次, 锁 {}",
            name,
            definitions.pairs.len(),
            definitions.retry,
            self.lock.path().display()
        );

        self.poll_loop(definitions).await;

        *self.state.write() = EngineState::Idle;
        info!(target: TARGET_STRATEGY, "⏹️ [{}] 引擎已停止", name);
        Ok(())
    }

    /// 清理上次异常退出残留的锁并读取首轮套利对
    async fn initial_definitions(&self) -> Result<DefinitionSet<S::Definition>, ArbitrageError> {
        self.lock.force_release()?;
        self.strategy.list_pairs().await
    }

    /// 请求停止并强制释放锁；当前套利对处理完后循环退出
    pub fn stop(&self) {
        let name = self.strategy.name();
        {
            let mut state = self.state.write();
            if *state != EngineState::Running {
                debug!(target: TARGET_STRATEGY, "[{}] 引擎未运行 ({})，忽略停止请求", name, *state);
                return;
            }
            *state = EngineState::StopRequested;
        }

        info!(target: TARGET_STRATEGY, "🛑 [{}] 请求停止引擎", name);
        if let Err(e) = self.lock.force_release() {
            warn!(target: TARGET_STRATEGY, "[{}] 释放锁 {} 失败: {}", name, self.lock.path().display(), e);
        }
    }

    async fn poll_loop(&self, initial: DefinitionSet<S::Definition>) {
        let name = self.strategy.name();
        let mut pending = Some(initial);

        while self.is_running() {
            let definitions = match pending.take() {
                Some(definitions) => definitions,
                None => match self.strategy.list_pairs().await {
                    Ok(definitions) => definitions,
                    Err(e) => {
                        error!(target: TARGET_STRATEGY, "[{}] 读取套利对失败: {}", name, e);
                        tokio::time::sleep(self.settings.lock_poll_interval).await;
                        continue;
                    }
                },
            };

            if definitions.is_empty() {
                debug!(target: TARGET_STRATEGY, "[{}] 套利对列表为空", name);
                tokio::time::sleep(self.settings.lock_poll_interval).await;
                continue;
            }

            self.run_pass(&definitions).await;
            self.counters.passes.fetch_add(1, Ordering::Relaxed);

            if self.settings.pass_interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.settings.pass_interval).await;
            }
        }
    }

    /// 按顺序处理一轮套利对
    async fn run_pass(&self, definitions: &DefinitionSet<S::Definition>) {
        let name = self.strategy.name();
        let events = &self.strategy.context().events;

        for definition in &definitions.pairs {
            if !self.is_running() {
                debug!(target: TARGET_STRATEGY, "[{}] 已请求停止，结束本轮", name);
                break;
            }

            let label = definition.label();
            let guard = match self.acquire_lock().await {
                Ok(Some(guard)) => guard,
                Ok(None) => {
                    debug!(target: TARGET_STRATEGY, "[{}] 等待锁时被取消: {}", name, label);
                    break;
                }
                Err(e) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    events.pair_failed(name, label, &e.to_string()).await;
                    continue;
                }
            };

            let outcome = self.strategy.handle_pair(definition, definitions.retry).await;
            drop(guard);

            self.counters.pairs_handled.fetch_add(1, Ordering::Relaxed);
            match outcome {
                Ok(PairOutcome::Traded(record)) => {
                    self.counters.trades.fetch_add(1, Ordering::Relaxed);
                    info!(target: TARGET_STRATEGY, "✅ [{}] {} 套利完成: {:?}", name, label, record.tx_hash);
                }
                Ok(PairOutcome::Skipped(_)) => {
                    self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                }
                Ok(PairOutcome::TradeFailed(_)) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    events.pair_failed(name, label, &e.to_string()).await;
                }
            }
        }
    }

    /// 轮询等待锁
    ///
    /// 返回 None 表示等待期间引擎被停止 (此时锁已被强制释放)
    pub async fn acquire_lock(&self) -> Result<Option<LockGuard>, ArbitrageError> {
        let started = Instant::now();
        let mut logged = false;

        loop {
            if !self.is_running() {
                self.lock.force_release()?;
                return Ok(None);
            }

            if let Some(guard) = self.lock.try_acquire()? {
                return Ok(Some(guard));
            }

            if !logged {
                debug!(target: TARGET_STRATEGY, "[{}] ⏳ 等待锁 {}", self.strategy.name(), self.lock.path().display());
                logged = true;
            }

            let waited = started.elapsed();
            if let Some(timeout) = self.settings.lock_wait_timeout {
                if waited >= timeout {
                    return Err(ArbitrageError::LockTimeout {
                        path: self.lock.path().display().to_string(),
                        waited,
                    });
                }
            }

            tokio::time::sleep(self.settings.lock_poll_interval).await;
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            name: self.strategy.name().to_string(),
            state: self.state(),
            lock_path: self.lock.path().display().to_string(),
            passes: self.counters.passes.load(Ordering::Relaxed),
            pairs_handled: self.counters.pairs_handled.load(Ordering::Relaxed),
            trades: self.counters.trades.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl<S: ArbitrageStrategy> EngineControl for ArbitrageEngine<S> {
    fn name(&self) -> &str {
        self.strategy.name()
    }

    fn state(&self) -> EngineState {
        ArbitrageEngine::state(self)
    }

    fn snapshot(&self) -> EngineSnapshot {
        ArbitrageEngine::snapshot(self)
    }

    async fn start(&self) -> Result<(), ArbitrageError> {
        ArbitrageEngine::start(self).await
    }

    fn stop(&self) {
        ArbitrageEngine::stop(self)
    }
}
