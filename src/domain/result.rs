use serde_json::Value;

use crate::domain::Item;

/// Normalized worker output.
///
/// `payload` is what gets snapshotted onto the website; `items` are the raw
/// per-product values, parsed one at a time so a bad entry stays isolated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeResult {
    pub payload: Value,
    pub items: Vec<Value>,
    pub list_shaped: bool,
}

impl ScrapeResult {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Batch-level domain, used when an item carries none of its own.
    pub fn domain(&self) -> Option<&str> {
        self.payload
            .get("domain")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
    }

    /// The first item that parses, for single-item summaries.
    pub fn first_item(&self) -> Option<Item> {
        self.items.iter().find_map(|v| Item::from_value(v).ok())
    }
}
