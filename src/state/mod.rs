//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: The phase the crawl loop is in and its legal transitions
//! - `StopReason`: Why the crawl loop ended
//! - `TerminalStatus`: How the run ended, as reported to the operator

mod outcome;
mod phase;

// Re-export main types
pub use outcome::{StopReason, TerminalStatus};
pub use phase::CrawlPhase;
