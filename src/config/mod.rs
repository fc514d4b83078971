//! Configuration module for Sumi-Scribe
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, plus the URL-list input file. The command line overrides whatever
//! the file sets.
//!
//! # Example
//!
//! ```no_run
//! use sumi_scribe::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scribe.toml")).unwrap();
//! println!("Browser backend: {}", config.browser.kind);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, BrowserKind, Config, CrawlConfig, OutputConfig, OutputFormat, WaitStrategy,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, read_url_list,
};
pub use validation::{validate, validate_selector};
