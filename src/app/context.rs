use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::app::error::{PricewatchError, Result};
use crate::config::Config;
use crate::notify::whatsapp::TwilioOptions;
use crate::notify::{
    HttpMailer, LogMailer, Mailer, NotificationDispatcher, ShareNotifier, TwilioWhatsApp,
    WhatsAppSender,
};
use crate::pipeline::ScrapePipeline;
use crate::store::SqliteStore;
use crate::worker::{ProcessWorker, Worker};

/// Everything built once at startup and handed to the commands.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub pipeline: ScrapePipeline<SqliteStore>,
    pub share: ShareNotifier,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.database.path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let worker: Arc<dyn Worker + Send + Sync> = Arc::new(
            ProcessWorker::new(&config.worker.program, &config.worker.script_path)
                .with_timeout(config.worker.timeout())
                .with_headless_arg(&config.worker.headless_arg),
        );
        let mailer = Self::build_mailer(&config)?;
        let whatsapp = Self::build_whatsapp(&config)?;

        let dispatcher = NotificationDispatcher::new(store.clone(), mailer.clone())
            .with_dashboard_url(&config.email.dashboard_url);
        let pipeline = ScrapePipeline::with_dispatcher(store.clone(), worker, dispatcher);
        let share = ShareNotifier::new(mailer, whatsapp);

        Ok(Self {
            config,
            store,
            pipeline,
            share,
        })
    }

    fn build_mailer(config: &Config) -> Result<Arc<dyn Mailer + Send + Sync>> {
        match config.email.credentials() {
            Some(key) => Ok(Arc::new(HttpMailer::new(
                &config.email.api_url,
                key,
                &config.email.from,
            )?)),
            None => {
                info!("Email API key not configured, emails will only be logged");
                Ok(Arc::new(LogMailer))
            }
        }
    }

    fn build_whatsapp(config: &Config) -> Result<Option<Arc<dyn WhatsAppSender + Send + Sync>>> {
        let wa = &config.whatsapp;
        if !wa.is_configured() {
            return Ok(None);
        }
        let options = TwilioOptions {
            account_sid: wa.account_sid.clone().unwrap_or_default(),
            auth_token: wa.auth_token.clone().unwrap_or_default(),
            from_number: wa.from_number.clone().unwrap_or_default(),
            api_base: wa.api_base.clone(),
        };
        Ok(Some(Arc::new(TwilioWhatsApp::new(options)?)))
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| PricewatchError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("pricewatch");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("pricewatch.db"))
    }
}
