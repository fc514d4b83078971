//! Sumi-Scribe: a site-scoped headless-browser scraper
//!
//! This crate drives a headless browser over the Chrome DevTools Protocol,
//! walks a single site breadth-first, extracts readable content from every
//! rendered page and emits the collected records as XML or JSON. Partial
//! results survive browser failures and user cancellation.

pub mod browser;
pub mod config;
pub mod content;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Scribe operations
///
/// Only conditions that abort a run before crawling begins surface here.
/// Per-page failures are recovered inside the crawl loop.
#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser provisioning failed: {0}")]
    Provision(#[from] browser::ProvisionError),

    #[error("Browser session failed: {0}")]
    Session(#[from] browser::SessionError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid glob pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid content selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Invalid URL '{input}': {reason}")]
    Invalid { input: String, reason: String },
}

/// Result type alias for Sumi-Scribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;

// Re-export commonly used types
pub use config::Config;
pub use content::PageRecord;
pub use crawler::{run, CrawlOutcome, RunReport, SeedMode};
pub use state::{CrawlPhase, StopReason, TerminalStatus};
pub use url::{canonicalize, should_process_content, PatternSet};
