//! # pricewatch
//!
//! Multi-tenant product and price tracking built around a scrape ingestion
//! pipeline.
//!
//! ## Architecture
//!
//! ```text
//! Worker → Extractor → Reconciler → State Tracker → Dispatcher
//! ```
//!
//! An external scraping worker prints log lines mixed with one JSON result
//! line. The result is extracted, each item is upserted into the requesting
//! owner's product partition, the website's snapshot is recorded, and the
//! owner is notified.
//!
//! ## Quick Start
//!
//! ```bash
//! # Register a website and a user
//! pricewatch website add "Lamp Shop" https://shop.example/lamps --owner alice
//! pricewatch user add alice alice@example.com
//!
//! # Scrape it into alice's partition
//! pricewatch scrape 1 --owner alice --max-price 50
//!
//! # Browse the results
//! pricewatch products --owner alice --name lamp
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// the pipeline and the notification channels from a [`Config`](config::Config).
pub mod app;

/// Command-line interface using clap.
///
/// - `website add|list|show|remove|enable|disable` - Manage websites
/// - `user add` - Register an owner's email address
/// - `scrape <id>` - Run the pipeline for one website
/// - `products` - Browse stored products
/// - `notifications` - Show in-app notifications
pub mod cli;

/// Configuration file and environment overrides.
///
/// Loads from `~/.config/pricewatch/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`ScrapeRequest`](domain::ScrapeRequest): one pipeline invocation
/// - [`Item`](domain::Item): a raw scraped item
/// - [`Product`](domain::Product): a persisted product, keyed by (url, owner)
/// - [`Website`](domain::Website): a scrape target and its last snapshot
pub mod domain;

/// Locates the result line in worker output and normalizes its shape.
pub mod extractor;

/// Completion notices and the manual share path.
///
/// - [`NotificationDispatcher`](notify::NotificationDispatcher): in-app + email after a scrape
/// - [`ShareNotifier`](notify::ShareNotifier): email/WhatsApp to explicit recipients
pub mod notify;

/// The scrape ingestion pipeline.
///
/// [`ScrapePipeline::run_scrape`](pipeline::ScrapePipeline::run_scrape) is the
/// entry point; reconciliation, state tracking and the per-website lock live
/// in submodules.
pub mod pipeline;

/// Persistence.
///
/// - [`Store`](store::Store): umbrella over the capability traits
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`MemoryStore`](store::MemoryStore): in-process implementation
pub mod store;

/// Out-of-process scraping worker.
///
/// - [`Worker`](worker::Worker): async trait for invocation
/// - [`ProcessWorker`](worker::ProcessWorker): child process with a wall-clock timeout
pub mod worker;
