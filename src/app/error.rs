use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricewatchError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start worker process: {0}")]
    ProcessStart(String),

    #[error("Worker process exited with {status}. Error: {stderr}")]
    WorkerExit { status: String, stderr: String },

    #[error("Worker reported an error: {0}")]
    WorkerReported(String),

    #[error("No valid JSON output found from worker")]
    NoResultFound,

    #[error("A product already exists for {0}")]
    DuplicateProduct(String),

    #[error("Malformed item: {0}")]
    MalformedItem(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("A scrape is already running for website {0}")]
    ScrapeInProgress(i64),

    #[error("Website not found: {0}")]
    WebsiteNotFound(i64),

    #[error("Website {0} is inactive")]
    WebsiteInactive(i64),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Access denied")]
    AccessDenied,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PricewatchError>;
