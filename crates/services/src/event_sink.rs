//! 套利事件出口
//!
//! 策略只通过这个 trait 报告结果，持久化和通知由实现决定

use async_trait::async_trait;
use ethers::types::U256;
use models::{ProfitResult, TradeRecord};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use utils::TARGET_STRATEGY;

use crate::database::TradeLog;
use crate::notifier::NotificationHub;

/// 套利事件
///
/// 实现内部的错误不得向上传播
#[async_trait]
pub trait ArbitrageEventSink: Send + Sync {
    /// 某个试探金额模拟失败 (跳过该金额)
    async fn probe_failed(&self, strategy: &str, label: &str, amount: U256, error: &str);

    /// 利润不足，未下单
    async fn trade_skipped(&self, strategy: &str, label: &str, result: &ProfitResult, min_profit: &str);

    async fn trade_succeeded(&self, record: &TradeRecord);

    async fn trade_failed(&self, strategy: &str, label: &str, error: &str);

    /// 套利对处理失败 (池子/代币查询等)，不影响其它套利对
    async fn pair_failed(&self, strategy: &str, label: &str, error: &str);
}

/// 记录日志，成交时写库并发送通知
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    trade_log: Option<Arc<dyn TradeLog>>,
    notifications: NotificationHub,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trade_log(mut self, trade_log: Arc<dyn TradeLog>) -> Self {
        self.trade_log = Some(trade_log);
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationHub) -> Self {
        self.notifications = notifications;
        self
    }
}

#[async_trait]
impl ArbitrageEventSink for RecordingEventSink {
    async fn probe_failed(&self, strategy: &str, label: &str, amount: U256, error: &str) {
        debug!(target: TARGET_STRATEGY, "[{}] {} 试探金额 {} 失败: {}", strategy, label, amount, error);
    }

    async fn trade_skipped(&self, strategy: &str, label: &str, result: &ProfitResult, min_profit: &str) {
        debug!(
            target: TARGET_STRATEGY,
            "[{}] {} 利润不足: best={} amount={} min={} ({}/{} 次试探失败)",
            strategy,
            label,
            result.best_profit,
            result.best_amount,
            min_profit,
            result.probes_failed,
            result.probes_total
        );
    }

    async fn trade_succeeded(&self, record: &TradeRecord) {
        let summary = record.summary();
        info!(target: TARGET_STRATEGY, "💰 {}", summary);

        // 写库在后台完成，不阻塞下一个套利对
        if let Some(trade_log) = &self.trade_log {
            let trade_log = Arc::clone(trade_log);
            let record = record.clone();
            tokio::spawn(async move {
                if let Err(e) = trade_log.append(&record).await {
                    error!(target: TARGET_STRATEGY, "保存交易记录失败 {:?}: {}", record.tx_hash, e);
                }
            });
        }

        self.notifications.broadcast(&summary);
    }

    async fn trade_failed(&self, strategy: &str, label: &str, error: &str) {
        warn!(target: TARGET_STRATEGY, "[{}] {} 交易失败: {}", strategy, label, error);
        self.notifications
            .broadcast(&format!("⚠️ Arbitrage {} ({}) failed: {}", label, strategy, error));
    }

    async fn pair_failed(&self, strategy: &str, label: &str, error: &str) {
        error!(target: TARGET_STRATEGY, "[{}] {} 处理失败: {}", strategy, label, error);
    }
}
