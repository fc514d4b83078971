//! Crawl loop phase definitions
//!
//! The crawler moves through these phases for every URL it handles and
//! ends in `Finalized` exactly once.

use std::fmt;

/// The phase the crawl loop is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// The queue is being filled from the seed URL or list
    Seeding,

    /// The next URL is being taken from the queue
    Dequeuing,

    /// A page is being loaded in the browser
    Fetching,

    /// The fetched path is checked against the match patterns
    Matching,

    /// The content processor is turning HTML into a record
    Processing,

    /// Same-host links from the page are being queued
    LinkExpansion,

    /// Collected records are being written out
    Draining,

    /// The run is over
    Finalized,
}

impl CrawlPhase {
    /// Returns true if the loop may move from this phase to `next`
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;

        matches!(
            (self, next),
            (Seeding, Dequeuing)
                | (Dequeuing, Fetching)
                | (Dequeuing, Draining)
                | (Fetching, Matching)
                | (Fetching, Dequeuing)
                | (Fetching, Draining)
                | (Matching, Processing)
                | (Matching, LinkExpansion)
                | (Matching, Dequeuing)
                | (Processing, LinkExpansion)
                | (Processing, Dequeuing)
                | (LinkExpansion, Dequeuing)
                | (Draining, Finalized)
        )
    }

    /// Returns true for the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Dequeuing => "dequeuing",
            Self::Fetching => "fetching",
            Self::Matching => "matching",
            Self::Processing => "processing",
            Self::LinkExpansion => "link_expansion",
            Self::Draining => "draining",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
