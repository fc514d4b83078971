//! Browser module for driving a headless browser
//!
//! This module owns everything between the crawler and the browser process:
//! - Locating the browser executable (`Provisioner`)
//! - Spawning an external CDP server and waiting for its port
//! - Connecting to, or launching, the browser over the DevTools protocol
//! - The single page every fetch goes through (`BrowserPage`)
//! - Ordered teardown of page, connection and process

mod launch;
mod page;
mod provision;
mod session;

pub use launch::{allocate_port, wait_for_port, BrowserProcess, Diagnostics};
pub use page::CdpPage;
pub use provision::{default_data_dir, FsProvisioner, PreparedBrowser, ProvisionError, Provisioner};
pub use session::{BrowserSession, SessionError};

use crate::config::WaitStrategy;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure kinds reported by a page operation
///
/// The crawler decides retry and criticality from these variants alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page is closed")]
    Closed,

    #[error("browser connection lost: {0}")]
    Disconnected(String),

    #[error("target closed: {0}")]
    TargetClosed(String),

    #[error("operation timed out")]
    Timeout,

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// The page capability the fetcher drives
///
/// One page serves every fetch of a session and is never used by two
/// fetches at once.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// True once the page has been closed
    fn is_closed(&self) -> bool;

    /// True while the automation connection is alive
    fn is_connected(&self) -> bool;

    /// Navigates to `url` and waits for the given strategy
    async fn navigate(
        &self,
        url: &str,
        wait: WaitStrategy,
        timeout: Duration,
    ) -> Result<(), PageError>;

    /// Serializes the current DOM to HTML
    async fn content(&self) -> Result<String, PageError>;

    /// The current document title
    async fn title(&self) -> Result<Option<String>, PageError>;

    /// Closes the page
    async fn close(&self) -> Result<(), PageError>;
}
