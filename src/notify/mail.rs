use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::app::{PricewatchError, Result};
use crate::notify::{EmailMessage, Mailer};

/// Sends mail through an HTTP email API (bearer token, JSON body).
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("pricewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let body = json!({
            "from": self.from,
            "to": [message.to],
            "subject": message.subject,
            "html": message.html,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PricewatchError::Notification(format!(
                "email API returned {}: {}",
                status, text
            )));
        }

        debug!(to = %message.to, "Email sent");
        Ok(())
    }
}

/// Stand-in used when no email API key is configured. Logs instead of sending.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "[EMAIL SIMULATION] no API key configured, email not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let message = EmailMessage {
            to: "a@example.com".into(),
            subject: "hi".into(),
            html: "<p>hi</p>".into(),
        };
        assert!(LogMailer.send(&message).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_mailer_unreachable_is_error() {
        let mailer = HttpMailer::new("http://127.0.0.1:9/emails", "key", "from@example.com").unwrap();
        let message = EmailMessage {
            to: "a@example.com".into(),
            subject: "hi".into(),
            html: String::new(),
        };
        assert!(mailer.send(&message).await.is_err());
    }
}
