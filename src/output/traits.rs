//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers and the
//! summary reported at the end of every run.

use crate::content::PageRecord;
use crate::state::{StopReason, TerminalStatus};
use chrono::{DateTime, Local};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives the collected records once the crawl loop ends
pub trait OutputHandler: Send {
    /// Persists the records and returns how many were written
    ///
    /// An empty slice is a normal outcome, not an error.
    fn write_records(&mut self, records: &[PageRecord]) -> OutputResult<usize>;
}

/// What the operator is told when a run ends
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub status: TerminalStatus,
    pub stop_reason: StopReason,
    pub pages_saved: usize,
    pub pages_visited: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl CrawlSummary {
    /// Wall-clock duration of the run in seconds
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }
}
