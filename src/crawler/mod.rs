//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Browser fetching with retry logic and cancellation
//! - HTML link extraction
//! - The FIFO frontier with its visited set
//! - Overall crawl coordination
//!
//! `run` ties a crawl to a browser session: it provisions and opens the
//! browser, crawls, and always tears the session down afterwards.

mod cancel;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use cancel::{watch, CancellationSource, ChannelSource, DelaySource, SignalSource};
pub use coordinator::{CrawlOptions, CrawlOutcome, Crawler, SeedMode};
pub use fetcher::{fetch_page_html, fetch_with_retry, navigation_timeout, FetchError};
pub use frontier::Frontier;
pub use parser::extract_links;

use crate::browser::{BrowserSession, Provisioner};
use crate::config::Config;
use crate::content::ReadabilityProcessor;
use crate::output::{CrawlSummary, RecordWriter};
use crate::state::{StopReason, TerminalStatus};
use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

/// What a finished run reports back to the caller
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records_written: usize,
    pub status: TerminalStatus,
    pub summary: CrawlSummary,
}

/// Runs a complete scrape
///
/// This is the main entry point. It will:
/// 1. Compile the crawl patterns and check the seed
/// 2. Resolve the browser executable
/// 3. Open and health-check a browser session
/// 4. Crawl until the queue empties, the cap is hit, cancellation or a critical error
/// 5. Write the records and tear the session down
///
/// # Arguments
///
/// * `seeds` - The start URL or fixed URL list
/// * `config` - The validated configuration
/// * `provisioner` - Locates the browser executable
/// * `cancel` - Flipped by whoever may stop the run
///
/// # Returns
///
/// * `Ok(RunReport)` - The crawl ran; its status may still be `Failed`
/// * `Err(ScribeError)` - The run could not start
pub async fn run(
    seeds: SeedMode,
    config: &Config,
    provisioner: &dyn Provisioner,
    cancel: CancellationToken,
) -> crate::Result<RunReport> {
    let started_at = Local::now();

    let options = CrawlOptions::from_config(&config.crawl)?;
    seeds.validate()?;

    let prepared = provisioner.prepare(config.browser.kind)?;

    if cancel.is_cancelled() {
        tracing::info!("Cancelled before the browser was started");
        return Ok(cancelled_report(started_at));
    }

    tracing::info!("Starting {} browser", prepared.kind);
    // Dropping an unfinished open kills any process it spawned.
    let session = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::info!("Cancelled while the browser was starting");
            return Ok(cancelled_report(started_at));
        }
        session = BrowserSession::open(&prepared, &config.browser) => session?,
    };

    let crawler = match Crawler::new(
        seeds,
        session.page(),
        Box::new(ReadabilityProcessor::new()),
        Box::new(RecordWriter::from_config(&config.output)),
        options,
        cancel,
    ) {
        Ok(crawler) => crawler,
        Err(e) => {
            session.cleanup().await;
            return Err(e.into());
        }
    };

    let outcome = crawler.run().await;

    if outcome.status == TerminalStatus::Failed {
        session.log_failure();
    }
    session.cleanup().await;

    let summary = CrawlSummary {
        status: outcome.status,
        stop_reason: outcome.stop_reason.clone(),
        pages_saved: outcome.records.len(),
        pages_visited: outcome.pages_visited,
        started_at,
        finished_at: Local::now(),
    };

    Ok(RunReport {
        records_written: outcome.records_written,
        status: outcome.status,
        summary,
    })
}

fn cancelled_report(started_at: DateTime<Local>) -> RunReport {
    RunReport {
        records_written: 0,
        status: TerminalStatus::Cancelled,
        summary: CrawlSummary {
            status: TerminalStatus::Cancelled,
            stop_reason: StopReason::Cancelled,
            pages_saved: 0,
            pages_visited: 0,
            started_at,
            finished_at: Local::now(),
        },
    }
}
