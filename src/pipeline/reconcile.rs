use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::app::{PricewatchError, Result};
use crate::domain::{Item, ProductDraft};
use crate::store::ProductStore;

/// Batch-wide inputs for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileContext<'a> {
    pub website_id: i64,
    pub owner_id: Option<&'a str>,
    /// Used for items that carry no URL of their own.
    pub default_url: Option<&'a str>,
    pub batch_domain: Option<&'a str>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub saved: usize,
    pub created: usize,
    pub updated: usize,
    /// Items dropped for lack of a usable URL.
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
}

enum Outcome {
    Created,
    Updated,
    Skipped,
}

/// Upsert every item into the owner's partition. A failing item is logged and
/// left out of `saved`; it never stops the rest of the batch.
pub fn reconcile<P>(store: &P, items: &[Value], ctx: &ReconcileContext<'_>) -> ReconcileReport
where
    P: ProductStore + ?Sized,
{
    let mut report = ReconcileReport::default();

    for value in items {
        match reconcile_item(store, value, ctx) {
            Ok(Outcome::Created) => {
                report.saved += 1;
                report.created += 1;
            }
            Ok(Outcome::Updated) => {
                report.saved += 1;
                report.updated += 1;
            }
            Ok(Outcome::Skipped) => report.skipped += 1,
            Err(e) => {
                let name = item_name(value);
                warn!(
                    website_id = ctx.website_id,
                    item = %name,
                    error = %e,
                    "Failed to save scraped item"
                );
                report.failures.push(ItemFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

fn reconcile_item<P>(store: &P, value: &Value, ctx: &ReconcileContext<'_>) -> Result<Outcome>
where
    P: ProductStore + ?Sized,
{
    let item = Item::from_value(value)?;

    let url = item
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .or_else(|| ctx.default_url.map(str::trim).filter(|u| !u.is_empty()));

    let Some(url) = url else {
        debug!(item = item.display_name(), "Skipping item without a URL");
        return Ok(Outcome::Skipped);
    };

    let draft = ProductDraft::from_item(
        &item,
        url.to_string(),
        ctx.website_id,
        ctx.owner_id,
        ctx.batch_domain,
        ctx.timestamp,
    );

    if let Some(existing) = store.find_product_by_key(&draft.url, ctx.owner_id)? {
        store.update_product(existing.id, &draft)?;
        return Ok(Outcome::Updated);
    }

    match store.create_product(&draft) {
        Ok(_) => Ok(Outcome::Created),
        // Another run created the same identity between lookup and insert.
        Err(PricewatchError::DuplicateProduct(_)) => {
            let existing = store
                .find_product_by_key(&draft.url, ctx.owner_id)?
                .ok_or_else(|| PricewatchError::DuplicateProduct(draft.url.clone()))?;
            store.update_product(existing.id, &draft)?;
            Ok(Outcome::Updated)
        }
        Err(e) => Err(e),
    }
}

fn item_name(value: &Value) -> String {
    value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("(unnamed)")
        .to_string()
}
