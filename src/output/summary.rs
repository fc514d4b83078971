//! End-of-run summary
//!
//! The summary goes to stderr with the logs, so stdout carries nothing but
//! page records.

use crate::output::traits::CrawlSummary;
use std::io::Write;

/// Formats the run summary
pub fn format_summary(summary: &CrawlSummary) -> String {
    let mut text = String::new();

    text.push_str("--- Scraping Summary ---\n");
    text.push_str(&format!("Status: {}\n", summary.status.describe()));
    text.push_str(&format!("Pages Saved: {}\n", summary.pages_saved));
    text.push_str(&format!("Pages Visited: {}\n", summary.pages_visited));
    text.push_str(&format!("Stopped: {}\n", summary.stop_reason));
    text.push_str(&format!(
        "Started: {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    text.push_str(&format!("Duration: {:.2}s\n", summary.duration_seconds()));

    text
}

/// Prints the run summary to stderr
pub fn print_summary(summary: &CrawlSummary) {
    let text = format_summary(summary);
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr);
    let _ = stderr.write_all(text.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StopReason, TerminalStatus};
    use chrono::{Duration, Local};

    fn summary(status: TerminalStatus, reason: StopReason, saved: usize) -> CrawlSummary {
        let started_at = Local::now();
        CrawlSummary {
            status,
            stop_reason: reason,
            pages_saved: saved,
            pages_visited: saved + 1,
            started_at,
            finished_at: started_at + Duration::milliseconds(1500),
        }
    }

    #[test]
    fn test_completed_summary() {
        let text = format_summary(&summary(
            TerminalStatus::Completed,
            StopReason::QueueExhausted,
            2,
        ));
        assert!(text.contains("Scraping Summary"));
        assert!(text.contains("Status: Completed"));
        assert!(text.contains("Pages Saved: 2"));
        assert!(text.contains("Pages Visited: 3"));
        assert!(text.contains("Duration: 1.50s"));
    }

    #[test]
    fn test_cancelled_summary() {
        let text = format_summary(&summary(
            TerminalStatus::Cancelled,
            StopReason::Cancelled,
            1,
        ));
        assert!(text.contains("Status: Cancelled by user"));
        assert!(text.contains("Pages Saved: 1"));
    }

    #[test]
    fn test_failed_summary() {
        let text = format_summary(&summary(
            TerminalStatus::Failed,
            StopReason::Critical("browser disconnected".to_string()),
            0,
        ));
        assert!(text.contains("Status: Failed"));
        assert!(text.contains("critical error: browser disconnected"));
    }
}
