//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop, which:
//! - Seeds the frontier from one start URL or a fixed list
//! - Fetches one page at a time through the session's page
//! - Hands matching pages to the content processor
//! - Queues same-host links in single-seed mode
//! - Writes out whatever was collected, however the loop ended

use crate::browser::BrowserPage;
use crate::config::{CrawlConfig, WaitStrategy};
use crate::content::{ContentProcessor, PageRecord};
use crate::crawler::fetcher::{fetch_with_retry, FetchError};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::extract_links;
use crate::output::OutputHandler;
use crate::state::{CrawlPhase, StopReason, TerminalStatus};
use crate::url::{canonicalize, extract_host, is_same_host, should_process_content, PatternSet};
use crate::ConfigError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Where the crawl starts and whether it discovers new pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedMode {
    /// One start URL; same-host links are followed
    SingleSeed(String),

    /// A closed list of URLs; nothing else is queued
    FixedList(Vec<String>),
}

impl SeedMode {
    /// Checks the seed before any browser is started
    ///
    /// A single seed must canonicalize to an HTTP(S) URL. List entries are
    /// checked when the crawl is seeded, where bad ones are skipped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::SingleSeed(raw) => canonical_seed(raw).map(|_| ()),
            Self::FixedList(_) => Ok(()),
        }
    }

    pub fn discovers_links(&self) -> bool {
        matches!(self, Self::SingleSeed(_))
    }
}

fn canonical_seed(raw: &str) -> Result<(String, Url), ConfigError> {
    let canonical =
        canonicalize(raw).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
    let url = Url::parse(&canonical).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' must use http or https",
            raw.trim()
        )));
    }

    Ok((canonical, url))
}

/// Compiled crawl settings
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub match_patterns: PatternSet,
    pub follow_patterns: PatternSet,

    /// 0 means unbounded
    pub result_cap: usize,
    pub content_selector: Option<String>,
    pub wait: WaitStrategy,
    pub fetch_timeout: Duration,
    pub max_retries: u32,
}

impl CrawlOptions {
    /// Compiles the patterns of a crawl configuration
    pub fn from_config(config: &CrawlConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            match_patterns: PatternSet::compile(&config.match_patterns)?,
            follow_patterns: PatternSet::compile(&config.follow_patterns)?,
            result_cap: config.result_cap,
            content_selector: config.content_selector.clone(),
            wait: config.wait,
            fetch_timeout: config.fetch_timeout(),
            max_retries: config.max_retries,
        })
    }
}

/// The result of one crawl
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Saved records in completion order
    pub records: Vec<PageRecord>,

    /// Records the output handler reported as written
    pub records_written: usize,
    pub stop_reason: StopReason,
    pub status: TerminalStatus,

    /// URLs ever queued, seeds included
    pub pages_visited: usize,

    /// Fetches that returned HTML
    pub pages_fetched: usize,

    /// URLs still queued when the loop stopped
    pub queue_remaining: usize,
    pub final_phase: CrawlPhase,
}

/// Main crawler structure
///
/// Constructed once per run around an already health-checked page, and
/// consumed by `run`.
pub struct Crawler {
    page: Arc<dyn BrowserPage>,
    processor: Box<dyn ContentProcessor>,
    output: Box<dyn OutputHandler>,
    options: CrawlOptions,
    cancel: CancellationToken,
    frontier: Frontier,
    seed_host: Option<String>,
    results: Vec<PageRecord>,
    phase: CrawlPhase,
    fetched: usize,
}

impl Crawler {
    /// Creates a crawler and seeds its frontier
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Seeded and ready to run
    /// * `Err(ConfigError)` - The single seed URL is invalid
    pub fn new(
        seeds: SeedMode,
        page: Arc<dyn BrowserPage>,
        processor: Box<dyn ContentProcessor>,
        output: Box<dyn OutputHandler>,
        options: CrawlOptions,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let mut frontier = Frontier::new();
        let mut seed_host = None;

        match seeds {
            SeedMode::SingleSeed(raw) => {
                let (canonical, url) = canonical_seed(&raw)?;
                seed_host = extract_host(&url);
                frontier.push(canonical);
            }
            SeedMode::FixedList(list) => {
                for raw in &list {
                    match canonical_seed(raw) {
                        Ok((canonical, _)) => {
                            if !frontier.push(canonical) {
                                tracing::debug!("Duplicate URL in list: {}", raw);
                            }
                        }
                        Err(e) => tracing::warn!("Skipping URL from list: {}", e),
                    }
                }
                if frontier.is_empty() {
                    tracing::warn!("No valid URLs in the list");
                }
            }
        }

        tracing::info!(
            "Seeded {} URL(s){}",
            frontier.len(),
            seed_host
                .as_deref()
                .map(|host| format!(", following links on {}", host))
                .unwrap_or_default()
        );

        Ok(Self {
            page,
            processor,
            output,
            options,
            cancel,
            frontier,
            seed_host,
            results: Vec::new(),
            phase: CrawlPhase::Seeding,
            fetched: 0,
        })
    }

    /// Number of URLs waiting in the queue
    pub fn queued(&self) -> usize {
        self.frontier.len()
    }

    /// Number of URLs ever queued
    pub fn visited(&self) -> usize {
        self.frontier.visited_count()
    }

    /// Runs the crawl loop to completion and writes the results
    ///
    /// Never fails: every ending (empty queue, cap reached, cancellation,
    /// critical browser error) drains the collected records to the output
    /// handler and reports how the run ended.
    pub async fn run(mut self) -> CrawlOutcome {
        self.transition(CrawlPhase::Dequeuing);
        let started = std::time::Instant::now();

        let stop_reason = loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation observed, stopping crawl");
                break StopReason::Cancelled;
            }

            if self.cap_reached() {
                tracing::info!("Result cap of {} reached", self.options.result_cap);
                break StopReason::ResultCapReached;
            }

            let Some(url) = self.frontier.pop() else {
                break StopReason::QueueExhausted;
            };

            tracing::info!(
                "Fetching {} ({} queued, {} saved)",
                url,
                self.frontier.len(),
                self.results.len()
            );

            self.transition(CrawlPhase::Fetching);
            let html = match fetch_with_retry(
                self.page.as_ref(),
                &self.cancel,
                &url,
                self.options.wait,
                self.options.fetch_timeout,
                self.options.max_retries,
            )
            .await
            {
                Ok(html) => html,
                Err(FetchError::Cancelled) => {
                    tracing::info!("Fetch of {} abandoned after cancellation", url);
                    break StopReason::Cancelled;
                }
                Err(e) if e.is_critical() => {
                    tracing::error!("Critical error while fetching {}: {}", url, e);
                    break StopReason::Critical(e.to_string());
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", url, e);
                    self.transition(CrawlPhase::Dequeuing);
                    continue;
                }
            };

            if self.cancel.is_cancelled() {
                tracing::info!("Discarding {} fetched after cancellation", url);
                break StopReason::Cancelled;
            }
            self.fetched += 1;

            let page_url = match Url::parse(&url) {
                Ok(page_url) => page_url,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", url, e);
                    self.transition(CrawlPhase::Dequeuing);
                    continue;
                }
            };

            self.transition(CrawlPhase::Matching);
            self.process_page(&url, page_url.path(), &html);

            if self.seed_host.is_some() && !self.cancel.is_cancelled() && !self.cap_reached() {
                self.transition(CrawlPhase::LinkExpansion);
                self.expand_links(&page_url, &html);
            }

            self.transition(CrawlPhase::Dequeuing);
        };

        tracing::info!(
            "Crawl finished ({}): {} fetched, {} saved, {} visited in {:?}",
            stop_reason,
            self.fetched,
            self.results.len(),
            self.frontier.visited_count(),
            started.elapsed()
        );

        self.finish(stop_reason)
    }

    fn cap_reached(&self) -> bool {
        self.options.result_cap > 0 && self.results.len() >= self.options.result_cap
    }

    /// Saves the page if its path matches the content patterns
    fn process_page(&mut self, url: &str, path: &str, html: &str) {
        if !should_process_content(path, &self.options.match_patterns) {
            tracing::debug!("{} does not match content patterns, not saving", url);
            return;
        }

        self.transition(CrawlPhase::Processing);
        match self
            .processor
            .process(url, html, self.options.content_selector.as_deref())
        {
            Ok(record) => {
                self.results.push(record);
                tracing::info!("Saved {} ({} total)", url, self.results.len());
            }
            Err(e) => tracing::warn!("Failed to process {}: {}", url, e),
        }
    }

    /// Queues unseen same-host links that pass the follow patterns
    fn expand_links(&mut self, page_url: &Url, html: &str) {
        let Some(seed_host) = self.seed_host.clone() else {
            return;
        };

        if !is_same_host(page_url, &seed_host) {
            tracing::debug!("{} left {}, not following its links", page_url, seed_host);
            return;
        }

        let mut seen_on_page = HashSet::new();
        let mut queued = 0usize;

        for link in extract_links(html, page_url) {
            let Ok(canonical) = canonicalize(&link) else {
                continue;
            };
            let Ok(target) = Url::parse(&canonical) else {
                continue;
            };

            if !is_same_host(&target, &seed_host) {
                tracing::trace!("Ignoring off-site link {}", canonical);
                continue;
            }

            if !seen_on_page.insert(canonical.clone()) || self.frontier.is_visited(&canonical) {
                continue;
            }

            if !self.options.follow_patterns.matches(target.path()) {
                tracing::trace!("{} does not match follow patterns", canonical);
                continue;
            }

            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation observed, not queueing more links");
                break;
            }

            tracing::debug!("Queued {}", canonical);
            self.frontier.push(canonical);
            queued += 1;
        }

        if queued > 0 {
            tracing::debug!("Queued {} new link(s) from {}", queued, page_url);
        }
    }

    /// Writes the collected records and builds the outcome
    fn finish(mut self, stop_reason: StopReason) -> CrawlOutcome {
        self.transition(CrawlPhase::Draining);

        let records_written = match self.output.write_records(&self.results) {
            Ok(written) => written,
            Err(e) => {
                tracing::error!("Failed to write results: {}", e);
                0
            }
        };

        self.transition(CrawlPhase::Finalized);
        let status = TerminalStatus::from_stop(&stop_reason, self.results.len());

        CrawlOutcome {
            records_written,
            status,
            stop_reason,
            pages_visited: self.frontier.visited_count(),
            pages_fetched: self.fetched,
            queue_remaining: self.frontier.len(),
            final_phase: self.phase,
            records: self.results,
        }
    }

    fn transition(&mut self, next: CrawlPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid crawl phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
    }
}
