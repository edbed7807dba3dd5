use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::PricewatchError;

/// How the worker should load the target page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMode {
    #[default]
    Static,
    Headless,
}

impl ScrapeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeMode::Static => "static",
            ScrapeMode::Headless => "headless",
        }
    }
}

impl fmt::Display for ScrapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrapeMode {
    type Err = PricewatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(ScrapeMode::Static),
            // Older workers call the browser-driven mode "selenium".
            "headless" | "selenium" => Ok(ScrapeMode::Headless),
            other => Err(PricewatchError::Other(format!(
                "Unknown scrape mode: {}. Use 'static' or 'headless'",
                other
            ))),
        }
    }
}

/// Optional narrowing passed through to the worker as flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeFilters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub name_filter: Option<String>,
    pub reference_filter: Option<String>,
    pub max_pages: Option<u32>,
}

impl ScrapeFilters {
    /// Render the present filters as worker flags, in a fixed order.
    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();

        if let Some(min) = self.min_price {
            flags.push("--minPrice".to_string());
            flags.push(min.to_string());
        }
        if let Some(max) = self.max_price {
            flags.push("--maxPrice".to_string());
            flags.push(max.to_string());
        }
        if let Some(name) = non_empty(&self.name_filter) {
            flags.push("--nameFilter".to_string());
            flags.push(name.to_string());
        }
        if let Some(reference) = non_empty(&self.reference_filter) {
            flags.push("--referenceFilter".to_string());
            flags.push(reference.to_string());
        }
        if let Some(pages) = self.max_pages {
            flags.push("--maxPages".to_string());
            flags.push(pages.to_string());
        }

        flags
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A single scrape invocation. Lives only for the duration of one run.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub website_id: i64,
    pub mode: ScrapeMode,
    pub target_url: String,
    pub filters: ScrapeFilters,
    /// `None` scrapes into the global (unowned) partition.
    pub owner_id: Option<String>,
}

impl ScrapeRequest {
    pub fn new(website_id: i64, mode: ScrapeMode, target_url: impl Into<String>) -> Self {
        Self {
            website_id,
            mode,
            target_url: target_url.into(),
            filters: ScrapeFilters::default(),
            owner_id: None,
        }
    }

    pub fn with_filters(mut self, filters: ScrapeFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_owner(mut self, owner_id: Option<String>) -> Self {
        self.owner_id = owner_id;
        self
    }

    /// Positional arguments followed by filter flags:
    /// `<script> <websiteId> <mode> <url> [--flag value]...`
    pub fn worker_args(&self, script_path: &str) -> Vec<String> {
        self.worker_args_with_mode(script_path, self.mode.as_str())
    }

    /// Same as [`worker_args`](Self::worker_args) with the mode spelled the
    /// way a particular worker expects it.
    pub fn worker_args_with_mode(&self, script_path: &str, mode_arg: &str) -> Vec<String> {
        let mut args = vec![
            script_path.to_string(),
            self.website_id.to_string(),
            mode_arg.to_string(),
            self.target_url.clone(),
        ];
        args.extend(self.filters.to_flags());
        args
    }
}
