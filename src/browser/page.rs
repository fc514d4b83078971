use crate::browser::{BrowserPage, PageError};
use crate::config::WaitStrategy;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle event name emitted when the document's load event fires
const LOAD: &str = "load";

/// Lifecycle event name emitted once the network has been quiet
const NETWORK_IDLE: &str = "networkIdle";

/// A DevTools page driven through chromiumoxide
pub struct CdpPage {
    page: Page,
    closed: AtomicBool,
    connected: Arc<AtomicBool>,
}

impl CdpPage {
    /// Wraps a page; `connected` is cleared when the connection handler stops
    pub fn new(page: Page, connected: Arc<AtomicBool>) -> Self {
        Self {
            page,
            closed: AtomicBool::new(false),
            connected,
        }
    }

    /// Maps a protocol error to a page error kind
    ///
    /// Once the connection handler has stopped every failure is reported as
    /// a lost connection, whatever the individual call returned.
    fn classify(&self, err: CdpError) -> PageError {
        if !self.is_connected() {
            return PageError::Disconnected(err.to_string());
        }

        match err {
            CdpError::Ws(_) | CdpError::Io(_) | CdpError::ChannelSendError(_) => {
                PageError::Disconnected(err.to_string())
            }
            CdpError::NoResponse => PageError::TargetClosed(err.to_string()),
            CdpError::Timeout => PageError::Timeout,
            CdpError::Chrome(_) | CdpError::ChromeMessage(_) => {
                PageError::Navigation(err.to_string())
            }
            _ => PageError::Protocol(err.to_string()),
        }
    }

    /// Starts a navigation and waits for the new document's lifecycle event
    ///
    /// `Page.navigate` is issued directly so the caller's timeout is the
    /// only bound on the load. Events are matched on the loader the
    /// navigation returned, which excludes anything still buffered for the
    /// previous document.
    async fn navigate_and_wait(&self, url: &str, wait: WaitStrategy) -> Result<(), PageError> {
        self.page
            .execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| self.classify(e))?;

        let mut events = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| self.classify(e))?;

        let navigation = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| self.classify(e))?
            .result;

        if let Some(error) = navigation.error_text {
            return Err(PageError::Navigation(format!("{}: {}", url, error)));
        }

        // Same-document navigations have no loader and fire no lifecycle events.
        let Some(loader_id) = navigation.loader_id else {
            return Ok(());
        };

        let target = lifecycle_event_name(wait);
        while let Some(event) = events.next().await {
            if event.frame_id == navigation.frame_id
                && event.loader_id == loader_id
                && event.name == target
            {
                return Ok(());
            }
        }

        Err(PageError::Disconnected(
            "lifecycle event stream ended".to_string(),
        ))
    }
}

/// The lifecycle event a wait strategy completes on
fn lifecycle_event_name(wait: WaitStrategy) -> &'static str {
    match wait {
        WaitStrategy::Load => LOAD,
        WaitStrategy::NetworkIdle => NETWORK_IDLE,
    }
}

#[async_trait]
impl BrowserPage for CdpPage {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn navigate(
        &self,
        url: &str,
        wait: WaitStrategy,
        timeout: Duration,
    ) -> Result<(), PageError> {
        tokio::time::timeout(timeout, self.navigate_and_wait(url, wait))
            .await
            .map_err(|_| PageError::Timeout)?
    }

    async fn content(&self) -> Result<String, PageError> {
        self.page.content().await.map_err(|e| self.classify(e))
    }

    async fn title(&self) -> Result<Option<String>, PageError> {
        self.page.get_title().await.map_err(|e| self.classify(e))
    }

    async fn close(&self) -> Result<(), PageError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.page.clone().close().await.map_err(|e| self.classify(e))
    }
}
