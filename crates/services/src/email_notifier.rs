//! 邮件通知
//!
//! 成交与异常通过 SMTP 发送给配置的收件人

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::str::FromStr;
use tracing::{error, info, warn};

use crate::notifier::Notifier;

type Mailer = AsyncSmtpTransport<Tokio1Executor>;

/// 邮件通知配置 (EMAIL_*)
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    pub to_emails: Vec<String>,
    pub use_tls: bool,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl EmailConfig {
    pub fn from_env() -> Self {
        let smtp_username = env_or("EMAIL_SMTP_USERNAME", String::new());

        Self {
            enabled: env_or("EMAIL_ENABLED", false),
            smtp_host: env_or("EMAIL_SMTP_HOST", "smtp.qq.com".to_string()),
            smtp_port: env_or("EMAIL_SMTP_PORT", 587),
            smtp_password: env_or("EMAIL_SMTP_PASSWORD", String::new()),
            from_email: env_or("EMAIL_FROM_ADDRESS", smtp_username.clone()),
            from_name: env_or("EMAIL_FROM_NAME", "Balancer Arbitrage Engine".to_string()),
            to_emails: parse_recipients(&env_or("EMAIL_TO_ADDRESSES", String::new())),
            use_tls: env_or("EMAIL_USE_TLS", true),
            smtp_username,
        }
    }

    fn mailer(&self) -> Result<Mailer> {
        let builder = if self.use_tls {
            Mailer::starttls_relay(&self.smtp_host)?
        } else {
            Mailer::relay(&self.smtp_host)?
        };

        Ok(builder
            .port(self.smtp_port)
            .credentials(Credentials::new(self.smtp_username.clone(), self.smtp_password.clone()))
            .build())
    }

    fn sender(&self) -> Result<Mailbox> {
        format!("{} <{}>", self.from_name, self.from_email)
            .parse()
            .map_err(|e| anyhow!("发件人地址无效: {}", e))
    }
}

fn parse_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// SMTP 连接与已解析的地址
struct Outbox {
    mailer: Mailer,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

/// 邮件通知器
pub struct EmailNotifier {
    outbox: Option<Outbox>,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        if !config.enabled {
            return Self { outbox: None };
        }

        let outbox = match Self::open(&config) {
            Ok(outbox) => Some(outbox),
            Err(e) => {
                error!("❌ 邮件通知初始化失败: {}", e);
                None
            }
        };
        Self { outbox }
    }

    fn open(config: &EmailConfig) -> Result<Outbox> {
        if config.smtp_username.is_empty() {
            return Err(anyhow!("未配置 EMAIL_SMTP_USERNAME"));
        }

        let recipients = config
            .to_emails
            .iter()
            .filter_map(|address| match address.parse::<Mailbox>() {
                Ok(mailbox) => Some(mailbox),
                Err(e) => {
                    warn!("⚠️  忽略无效收件人 {}: {}", address, e);
                    None
                }
            })
            .collect::<Vec<_>>();
        if recipients.is_empty() {
            return Err(anyhow!("EMAIL_TO_ADDRESSES 中没有有效收件人"));
        }

        Ok(Outbox {
            mailer: config.mailer()?,
            from: config.sender()?,
            recipients,
        })
    }

    /// 已启用且 SMTP 可用
    pub fn is_active(&self) -> bool {
        self.outbox.is_some()
    }
}

/// 包装成 HTML 邮件正文
fn render_html(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: Arial, sans-serif; background: #f5f5f5; padding: 20px;">
    <div style="max-width: 700px; margin: 0 auto; background: white; border-radius: 8px;">
        <div style="background: #1e1e2f; color: white; padding: 16px 24px;">
            <h3 style="margin: 0;">{}</h3>
            <small>{} (UTC+8)</small>
        </div>
        <pre style="padding: 16px 24px; white-space: pre-wrap; word-break: break-word;">{}</pre>
    </div>
</body>
</html>"#,
        escape_html(title),
        utils::now_shanghai_str(),
        escape_html(message),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, message: &str) -> Result<()> {
        let Some(outbox) = &self.outbox else {
            return Ok(());
        };

        let subject = message.lines().next().unwrap_or("Arbitrage");
        let body = render_html(subject, message);

        for recipient in &outbox.recipients {
            let email = Message::builder()
                .from(outbox.from.clone())
                .to(recipient.clone())
                .subject(subject)
                .header(ContentType::TEXT_HTML)
                .body(body.clone())?;

            match outbox.mailer.send(email).await {
                Ok(_) => info!("📧 邮件已发送: {}", recipient),
                Err(e) => error!("❌ 邮件发送失败 ({}): {}", recipient, e),
            }
        }

        Ok(())
    }
}
