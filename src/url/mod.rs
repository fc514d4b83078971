//! URL handling module for Sumi-Scribe
//!
//! This module provides URL canonicalization, host comparison and
//! glob-based path scoping.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, is_same_host};
pub use matcher::{should_process_content, PatternSet};
pub use normalize::canonicalize;
