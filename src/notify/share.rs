use std::sync::Arc;

use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::warn;

use crate::app::PricewatchError;
use crate::domain::{ScrapeResult, Website};
use crate::notify::{ChannelStatus, EmailMessage, Mailer, WhatsAppSender};

const MISSING: &str = "N/A";

/// Ad-hoc recipients given with a manual scrape trigger.
#[derive(Debug, Clone, Default)]
pub struct ShareTargets {
    pub email_to: Option<String>,
    pub whatsapp_to: Option<String>,
}

impl ShareTargets {
    pub fn is_empty(&self) -> bool {
        blank(&self.email_to) && blank(&self.whatsapp_to)
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map_or(true, str::is_empty)
}

/// What a shared result message shows: the first scraped item and the
/// website it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareDetails {
    pub name: String,
    pub price: String,
    pub reference: String,
    pub domain: String,
    pub url: String,
}

impl ShareDetails {
    pub fn from_result(result: &ScrapeResult, website: &Website) -> Self {
        let item = result.first_item().unwrap_or_default();
        let domain = url::Url::parse(&website.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        Self {
            name: item.name.unwrap_or_else(|| MISSING.to_string()),
            price: item.price.unwrap_or_else(|| MISSING.to_string()),
            reference: item.reference.unwrap_or_else(|| MISSING.to_string()),
            domain,
            url: website.url.clone(),
        }
    }

    pub fn email_html(&self) -> String {
        format!(
            "<h2>Scraping Result</h2>\n\
             <p><strong>Product:</strong> {}</p>\n\
             <p><strong>Price:</strong> {}</p>\n\
             <p><strong>Reference:</strong> {}</p>\n\
             <p><strong>Domain:</strong> {}</p>\n\
             <p><a href=\"{}\">View Product</a></p>",
            encode_text(&self.name),
            encode_text(&self.price),
            encode_text(&self.reference),
            encode_text(&self.domain),
            encode_double_quoted_attribute(&self.url),
        )
    }

    pub fn whatsapp_body(&self) -> String {
        format!(
            "*Scraping Result*\n\n*Product:* {}\n*Price:* {}\n*Ref:* {}\n*Link:* {}",
            self.name, self.price, self.reference, self.url
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareStatus {
    pub email: ChannelStatus,
    pub whatsapp: ChannelStatus,
}

/// Sends a scrape result to caller-supplied recipients. Both channels are
/// attempted concurrently and reported separately.
pub struct ShareNotifier {
    mailer: Arc<dyn Mailer + Send + Sync>,
    whatsapp: Option<Arc<dyn WhatsAppSender + Send + Sync>>,
}

impl ShareNotifier {
    pub fn new(
        mailer: Arc<dyn Mailer + Send + Sync>,
        whatsapp: Option<Arc<dyn WhatsAppSender + Send + Sync>>,
    ) -> Self {
        Self { mailer, whatsapp }
    }

    pub async fn share(
        &self,
        website_name: &str,
        details: &ShareDetails,
        targets: &ShareTargets,
    ) -> ShareStatus {
        let email = async {
            let Some(to) = targets.email_to.as_deref().filter(|s| !s.trim().is_empty()) else {
                return ChannelStatus::Skipped;
            };
            let message = EmailMessage {
                to: to.to_string(),
                subject: format!("Scraping Result: {}", website_name),
                html: details.email_html(),
            };
            ChannelStatus::from_result(self.mailer.send(&message).await)
        };

        let whatsapp = async {
            let Some(to) = targets.whatsapp_to.as_deref().filter(|s| !s.trim().is_empty()) else {
                return ChannelStatus::Skipped;
            };
            let result = match &self.whatsapp {
                Some(sender) => sender.send(to, &details.whatsapp_body()).await,
                None => Err(PricewatchError::Notification(
                    "WhatsApp is not configured".to_string(),
                )),
            };
            ChannelStatus::from_result(result)
        };

        let (email, whatsapp) = futures::join!(email, whatsapp);

        if let ChannelStatus::Failed(reason) = &email {
            warn!(channel = "email", error = %reason, "Share failed");
        }
        if let ChannelStatus::Failed(reason) = &whatsapp {
            warn!(channel = "whatsapp", error = %reason, "Share failed");
        }

        ShareStatus { email, whatsapp }
    }
}
