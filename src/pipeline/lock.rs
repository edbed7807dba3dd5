use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::app::{PricewatchError, Result};

/// In-process advisory lock: at most one running scrape per website.
#[derive(Clone, Default)]
pub struct ScrapeLocks {
    active: Arc<Mutex<HashSet<i64>>>,
}

impl ScrapeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a website, or fail with `ScrapeInProgress` if it is already held.
    pub fn try_acquire(&self, website_id: i64) -> Result<ScrapeGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(website_id) {
            return Err(PricewatchError::ScrapeInProgress(website_id));
        }
        Ok(ScrapeGuard {
            active: self.active.clone(),
            website_id,
        })
    }

    pub fn is_held(&self, website_id: i64) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&website_id)
    }
}

/// Releases its website when dropped.
pub struct ScrapeGuard {
    active: Arc<Mutex<HashSet<i64>>>,
    website_id: i64,
}

impl Drop for ScrapeGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.website_id);
    }
}
