use chrono::{DateTime, Utc};
use tracing::warn;

use crate::app::PricewatchError;
use crate::domain::{ScrapeResult, ScrapeStatus, WebsiteUpdate};
use crate::store::WebsiteStore;

/// Mark a website as being scraped. Advisory only: a failed write is logged.
pub fn mark_in_progress<W>(store: &W, website_id: i64)
where
    W: WebsiteStore + ?Sized,
{
    let update = WebsiteUpdate {
        status: Some(ScrapeStatus::InProgress),
        ..Default::default()
    };
    if let Err(e) = store.update_website(website_id, &update) {
        warn!(website_id, error = %e, "Failed to mark scrape in progress");
    }
}

/// Record how a scrape ended.
///
/// Success writes the snapshot, the timestamp and the status in a single
/// update. Failure only flips the status, so a broken run never leaves a
/// partial snapshot behind.
pub fn record_outcome<W>(
    store: &W,
    website_id: i64,
    outcome: std::result::Result<&ScrapeResult, &PricewatchError>,
    timestamp: DateTime<Utc>,
) where
    W: WebsiteStore + ?Sized,
{
    let update = match outcome {
        Ok(result) => WebsiteUpdate {
            scraped_data: Some(result.payload.clone()),
            last_scraped: Some(timestamp),
            status: Some(ScrapeStatus::Success),
            ..Default::default()
        },
        Err(_) => WebsiteUpdate {
            status: Some(ScrapeStatus::Failed),
            ..Default::default()
        },
    };

    if let Err(e) = store.update_website(website_id, &update) {
        warn!(website_id, error = %e, "Failed to record scrape outcome");
    }
}
