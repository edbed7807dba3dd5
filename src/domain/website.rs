use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::{PricewatchError, Result};

/// Advisory scrape state. Never gates reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrapeStatus {
    #[default]
    Idle,
    InProgress,
    Success,
    Failed,
}

impl ScrapeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Idle => "idle",
            ScrapeStatus::InProgress => "in-progress",
            ScrapeStatus::Success => "success",
            ScrapeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrapeStatus {
    type Err = PricewatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ScrapeStatus::Idle),
            "in-progress" => Ok(ScrapeStatus::InProgress),
            "success" => Ok(ScrapeStatus::Success),
            "failed" => Ok(ScrapeStatus::Failed),
            other => Err(PricewatchError::Other(format!(
                "Unknown scrape status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Website {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub description: String,
    pub category: String,
    pub owner_id: Option<String>,
    pub is_active: bool,
    pub scraped_data: Option<Value>,
    pub last_scraped: Option<DateTime<Utc>>,
    pub last_scrape_status: ScrapeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Website {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            url: url.into(),
            description: String::new(),
            category: "general".to_string(),
            owner_id: None,
            is_active: true,
            scraped_data: None,
            last_scraped: None,
            last_scrape_status: ScrapeStatus::Idle,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name must be present and the URL must be absolute http(s).
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PricewatchError::Other("Website name is required".into()));
        }
        let parsed = url::Url::parse(self.url.trim())?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(PricewatchError::Other(format!(
                "{} is not a valid URL: unsupported scheme {}",
                self.url, other
            ))),
        }
    }
}

/// Fields written by the scrape state tracker. `None` leaves a column as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebsiteUpdate {
    pub scraped_data: Option<Value>,
    pub last_scraped: Option<DateTime<Utc>>,
    pub status: Option<ScrapeStatus>,
    pub is_active: Option<bool>,
}

impl WebsiteUpdate {
    /// Adapters skip the write entirely when nothing is set.
    pub fn is_empty(&self) -> bool {
        self.scraped_data.is_none()
            && self.last_scraped.is_none()
            && self.status.is_none()
            && self.is_active.is_none()
    }
}
