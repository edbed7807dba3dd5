use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::app::{PricewatchError, Result};
use crate::notify::WhatsAppSender;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, without the `whatsapp:` prefix.
    pub from_number: String,
    pub api_base: String,
}

/// WhatsApp messages through the Twilio Messages API.
pub struct TwilioWhatsApp {
    client: Client,
    options: TwilioOptions,
}

impl TwilioWhatsApp {
    pub fn new(options: TwilioOptions) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, options })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.options.api_base.trim_end_matches('/'),
            self.options.account_sid
        )
    }
}

fn channel_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[async_trait]
impl WhatsAppSender for TwilioWhatsApp {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        let form = [
            ("From", channel_address(&self.options.from_number)),
            ("To", channel_address(to)),
            ("Body", body.to_string()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PricewatchError::Notification(format!(
                "Twilio returned {}: {}",
                status, text
            )));
        }

        debug!(to, "WhatsApp message sent");
        Ok(())
    }
}
