//! 通知渠道
//!
//! 成交等事件通过 [`NotificationHub`] 异步分发，发送失败只记录日志

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use config_crate::TelegramConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// 通知渠道
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, message: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot 通知
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn from_config(config: &TelegramConfig) -> Self {
        Self::new(config.bot_token.clone(), config.chat_id.clone())
    }

    /// 替换 API 地址 (自建 Bot API 服务)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(self.send_message_url())
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": message,
                "disable_web_page_preview": true,
            }))
            .send()
            .await?;

        let status = response.status();
        let body: TelegramResponse = response.json().await?;
        if !status.is_success() || !body.ok {
            return Err(anyhow!(
                "Telegram API error ({}): {}",
                status,
                body.description.unwrap_or_default()
            ));
        }

        debug!("Telegram 消息已发送");
        Ok(())
    }
}

/// 通知分发器
#[derive(Clone, Default)]
pub struct NotificationHub {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        info!("启用通知渠道: {}", notifier.name());
        self.notifiers.push(notifier);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// 在后台任务中发送，不阻塞调用方
    pub fn broadcast(&self, message: &str) {
        for notifier in &self.notifiers {
            let notifier = Arc::clone(notifier);
            let message = message.to_string();

            tokio::spawn(async move {
                if let Err(e) = notifier.notify(&message).await {
                    error!("通知发送失败 ({}): {}", notifier.name(), e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct CollectingNotifier {
        messages: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for CollectingNotifier {
        fn name(&self) -> &str {
            "collect"
        }

        async fn notify(&self, message: &str) -> Result<()> {
            if self.fail {
                return Err(anyhow!("offline"));
            }
            self.messages.lock().push(message.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_telegram_url() {
        let notifier = TelegramNotifier::new("123:abc", "42");
        assert_eq!(
            notifier.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );

        let custom = notifier.with_api_base("http://localhost:8081/");
        assert_eq!(custom.send_message_url(), "http://localhost:8081/bot123:abc/sendMessage");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_notifier() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let hub = NotificationHub::new()
            .with(Arc::new(CollectingNotifier { messages: messages.clone(), fail: true }))
            .with(Arc::new(CollectingNotifier { messages: messages.clone(), fail: false }));

        hub.broadcast("hello");

        for _ in 0..50 {
            if !messages.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(messages.lock().as_slice(), ["hello".to_string()]);
    }

    #[test]
    fn test_empty_hub() {
        assert!(NotificationHub::new().is_empty());
    }
}
