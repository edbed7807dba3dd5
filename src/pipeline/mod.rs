pub mod lock;
pub mod reconcile;
pub mod tracker;

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::app::{PricewatchError, Result};
use crate::domain::{ScrapeRequest, ScrapeResult, Website};
use crate::extractor::Extractor;
use crate::notify::{DispatchReport, Mailer, NotificationDispatcher};
use crate::store::Store;
use crate::worker::Worker;

pub use lock::{ScrapeGuard, ScrapeLocks};
pub use reconcile::{reconcile, ItemFailure, ReconcileContext, ReconcileReport};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct ScrapeSummary {
    /// The website as it was when the run started.
    pub website: Website,
    pub result: ScrapeResult,
    pub report: ReconcileReport,
    /// `None` when the request carried no owner.
    pub notifications: Option<DispatchReport>,
}

/// Worker -> extractor -> reconciler -> state tracker -> dispatcher.
pub struct ScrapePipeline<S> {
    store: Arc<S>,
    worker: Arc<dyn Worker + Send + Sync>,
    extractor: Extractor,
    dispatcher: NotificationDispatcher<S>,
    locks: ScrapeLocks,
}

impl<S> ScrapePipeline<S>
where
    S: Store + Send + Sync,
{
    pub fn new(
        store: Arc<S>,
        worker: Arc<dyn Worker + Send + Sync>,
        mailer: Arc<dyn Mailer + Send + Sync>,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(store.clone(), mailer);
        Self::with_dispatcher(store, worker, dispatcher)
    }

    pub fn with_dispatcher(
        store: Arc<S>,
        worker: Arc<dyn Worker + Send + Sync>,
        dispatcher: NotificationDispatcher<S>,
    ) -> Self {
        Self {
            store,
            worker,
            extractor: Extractor::new(),
            dispatcher,
            locks: ScrapeLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn locks(&self) -> &ScrapeLocks {
        &self.locks
    }

    /// Run one scrape end to end.
    ///
    /// Fails on any fatal worker or extraction error, in which case no
    /// product is written and the website keeps its previous snapshot.
    /// Per-item and per-channel failures only show up in the summary.
    pub async fn run_scrape(&self, request: &ScrapeRequest) -> Result<ScrapeSummary> {
        let website_id = request.website_id;
        let _guard = self.locks.try_acquire(website_id)?;

        let website = self
            .store
            .get_website(website_id)?
            .ok_or(PricewatchError::WebsiteNotFound(website_id))?;
        if !website.is_active {
            return Err(PricewatchError::WebsiteInactive(website_id));
        }

        let started_at = Utc::now();
        info!(
            website_id,
            mode = %request.mode,
            url = %request.target_url,
            owner_id = request.owner_id.as_deref().unwrap_or("-"),
            "Starting scrape"
        );
        tracker::mark_in_progress(self.store.as_ref(), website_id);

        let result = match self.invoke_and_extract(request).await {
            Ok(result) => result,
            Err(e) => {
                error!(website_id, error = %e, "Scrape failed");
                tracker::record_outcome(self.store.as_ref(), website_id, Err(&e), started_at);
                return Err(e);
            }
        };

        let target_url = request.target_url.trim();
        let ctx = ReconcileContext {
            website_id,
            owner_id: request.owner_id.as_deref(),
            default_url: Some(target_url).filter(|u| !u.is_empty()),
            batch_domain: result.domain(),
            timestamp: started_at,
        };
        let report = reconcile(self.store.as_ref(), &result.items, &ctx);

        tracker::record_outcome(self.store.as_ref(), website_id, Ok(&result), started_at);

        info!(
            website_id,
            saved = report.saved,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Scrape completed"
        );

        let notifications = match request.owner_id.as_deref() {
            Some(owner_id) => Some(
                self.dispatcher
                    .notify(owner_id, &request.target_url, report.saved)
                    .await,
            ),
            None => None,
        };

        Ok(ScrapeSummary {
            website,
            result,
            report,
            notifications,
        })
    }

    async fn invoke_and_extract(&self, request: &ScrapeRequest) -> Result<ScrapeResult> {
        let stdout = self.worker.invoke(request).await?.into_stdout()?;
        self.extractor.extract(&stdout)
    }
}
