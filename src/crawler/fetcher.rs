//! Browser page fetcher
//!
//! This module handles loading one URL in the session's page, including:
//! - Pre-checks on page and connection health
//! - A hard ceiling over navigation plus DOM serialization
//! - Racing the load against the cancellation token
//! - Retry logic for timeout-class and connection-level failures
//! - Error classification for the crawl loop

use crate::browser::{BrowserPage, PageError};
use crate::config::WaitStrategy;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Headroom left between the navigation timeout and the fetch ceiling
const NAVIGATION_HEADROOM: Duration = Duration::from_secs(5);

/// Shortest navigation timeout ever used
const MIN_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors from a single fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("fetch cancelled")]
    Cancelled,

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("page is closed")]
    PageClosed,

    #[error("browser disconnected: {0}")]
    BrowserDisconnected(String),

    #[error("target closed: {0}")]
    TargetClosed(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("page content is empty")]
    EmptyContent,
}

impl FetchError {
    /// Returns true if another attempt might succeed
    ///
    /// | Error | Retried |
    /// |-------|---------|
    /// | Timeout | yes |
    /// | BrowserDisconnected, TargetClosed | yes |
    /// | Cancelled, PageClosed | no |
    /// | Navigation, EmptyContent | no |
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::BrowserDisconnected(_) | Self::TargetClosed(_)
        )
    }

    /// Returns true if the failure concerns the browser rather than the page
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            Self::PageClosed | Self::BrowserDisconnected(_) | Self::TargetClosed(_)
        )
    }

    /// Returns true if the crawl loop must stop after this error
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Cancelled) || self.is_connection_level()
    }
}

/// The navigation timeout for a fetch ceiling
///
/// Navigation gets the ceiling minus some headroom (at least one second) so
/// it normally fails on its own before the outer deadline fires.
pub fn navigation_timeout(ceiling: Duration) -> Duration {
    ceiling
        .saturating_sub(NAVIGATION_HEADROOM)
        .max(MIN_NAVIGATION_TIMEOUT)
        .min(ceiling)
}

/// Loads `url` in `page` and returns the serialized DOM
///
/// The navigation and DOM read run as one future that is raced against
/// both the ceiling and the cancellation token. Whichever loses is dropped
/// and its result discarded.
///
/// # Returns
///
/// * `Ok(String)` - Non-empty HTML
/// * `Err(FetchError::Cancelled)` - The token fired first
/// * `Err(FetchError::Timeout)` - The ceiling elapsed first
/// * `Err(FetchError)` - The page or browser failed
pub async fn fetch_page_html(
    page: &dyn BrowserPage,
    cancel: &CancellationToken,
    url: &str,
    wait: WaitStrategy,
    ceiling: Duration,
) -> Result<String, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    if page.is_closed() {
        return Err(FetchError::PageClosed);
    }

    if !page.is_connected() {
        return Err(FetchError::BrowserDisconnected(
            "connection lost before navigation".to_string(),
        ));
    }

    let nav_timeout = navigation_timeout(ceiling);
    let load = async {
        page.navigate(url, wait, nav_timeout)
            .await
            .map_err(|e| classify_page_error(e, nav_timeout))?;
        page.content()
            .await
            .map_err(|e| classify_page_error(e, nav_timeout))
    };

    let html = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        result = tokio::time::timeout(ceiling, load) => {
            result.map_err(|_| FetchError::Timeout(ceiling))??
        }
    };

    if html.trim().is_empty() {
        return Err(FetchError::EmptyContent);
    }

    Ok(html)
}

/// Fetches with up to `max_retries` extra attempts for retryable errors
///
/// Cancellation is checked before every attempt.
pub async fn fetch_with_retry(
    page: &dyn BrowserPage,
    cancel: &CancellationToken,
    url: &str,
    wait: WaitStrategy,
    ceiling: Duration,
    max_retries: u32,
) -> Result<String, FetchError> {
    let mut retries = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        match fetch_page_html(page, cancel, url, wait, ceiling).await {
            Ok(html) => return Ok(html),
            Err(e) if e.is_retryable() && retries < max_retries => {
                retries += 1;
                tracing::warn!(
                    "Fetch of {} failed ({}), retrying ({}/{})",
                    url,
                    e,
                    retries,
                    max_retries
                );
            }
            Err(e) => return Err(e),
        }
    }
}

fn classify_page_error(err: PageError, nav_timeout: Duration) -> FetchError {
    match err {
        PageError::Closed => FetchError::PageClosed,
        PageError::Disconnected(reason) => FetchError::BrowserDisconnected(reason),
        PageError::TargetClosed(reason) => FetchError::TargetClosed(reason),
        PageError::Timeout => FetchError::Timeout(nav_timeout),
        PageError::Navigation(reason) | PageError::Protocol(reason) => {
            FetchError::Navigation(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Page that replays scripted navigation results
    struct ScriptedPage {
        results: Mutex<Vec<Result<String, PageError>>>,
        delay: Duration,
        closed: AtomicBool,
        connected: AtomicBool,
        navigations: AtomicUsize,
        timeouts: Mutex<Vec<Duration>>,
    }

    impl ScriptedPage {
        fn new(results: Vec<Result<String, PageError>>) -> Self {
            Self {
                results: Mutex::new(results),
                delay: Duration::ZERO,
                closed: AtomicBool::new(false),
                connected: AtomicBool::new(true),
                navigations: AtomicUsize::new(0),
                timeouts: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn navigations(&self) -> usize {
            self.navigations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrowserPage for ScriptedPage {
        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn navigate(
            &self,
            _url: &str,
            _wait: WaitStrategy,
            timeout: Duration,
        ) -> Result<(), PageError> {
            self.navigations.fetch_add(1, Ordering::SeqCst);
            self.timeouts.lock().unwrap().push(timeout);
            tokio::time::sleep(self.delay).await;
            let mut results = self.results.lock().unwrap();
            if matches!(results.first(), Some(Err(_))) {
                return results.remove(0).map(|_| ());
            }
            Ok(())
        }

        async fn content(&self) -> Result<String, PageError> {
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                return Ok(String::new());
            }
            results.remove(0)
        }

        async fn title(&self) -> Result<Option<String>, PageError> {
            Ok(None)
        }

        async fn close(&self) -> Result<(), PageError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    const URL: &str = "http://example.com/";

    #[tokio::test]
    async fn test_fetch_success() {
        let page = ScriptedPage::new(vec![Ok("<html>ok</html>".to_string())]);
        let cancel = CancellationToken::new();

        let html = fetch_page_html(&page, &cancel, URL, WaitStrategy::Load, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(html, "<html>ok</html>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_load_within_ceiling() {
        let page = ScriptedPage::new(vec![Ok("<html>slow</html>".to_string())])
            .with_delay(Duration::from_secs(45));
        let cancel = CancellationToken::new();

        let html = fetch_page_html(
            &page,
            &cancel,
            URL,
            WaitStrategy::Load,
            Duration::from_secs(120),
        )
        .await
        .unwrap();

        assert_eq!(html, "<html>slow</html>");
        assert_eq!(
            *page.timeouts.lock().unwrap(),
            vec![Duration::from_secs(115)]
        );
    }

    #[tokio::test]
    async fn test_empty_content() {
        let page = ScriptedPage::new(vec![Ok("   \n ".to_string())]);
        let cancel = CancellationToken::new();

        let result =
            fetch_page_html(&page, &cancel, URL, WaitStrategy::Load, Duration::from_secs(5)).await;
        assert_eq!(result, Err(FetchError::EmptyContent));
    }

    #[tokio::test]
    async fn test_closed_page_fails_fast() {
        let page = ScriptedPage::new(vec![Ok("<html></html>".to_string())]);
        page.closed.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();

        let result =
            fetch_page_html(&page, &cancel, URL, WaitStrategy::Load, Duration::from_secs(5)).await;
        assert_eq!(result, Err(FetchError::PageClosed));
        assert_eq!(page.navigations(), 0);
    }

    #[tokio::test]
    async fn test_disconnected_browser_fails_fast() {
        let page = ScriptedPage::new(vec![Ok("<html></html>".to_string())]);
        page.connected.store(false, Ordering::SeqCst);
        let cancel = CancellationToken::new();

        let result =
            fetch_page_html(&page, &cancel, URL, WaitStrategy::Load, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(FetchError::BrowserDisconnected(_))));
        assert_eq!(page.navigations(), 0);
    }

    #[tokio::test]
    async fn test_ceiling_timeout() {
        let page = ScriptedPage::new(vec![Ok("<html></html>".to_string())])
            .with_delay(Duration::from_secs(5));
        let cancel = CancellationToken::new();

        let result = fetch_page_html(
            &page,
            &cancel,
            URL,
            WaitStrategy::Load,
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(result, Err(FetchError::Timeout(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_slow_load() {
        let page = ScriptedPage::new(vec![Ok("<html></html>".to_string())])
            .with_delay(Duration::from_secs(5));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result =
            fetch_page_html(&page, &cancel, URL, WaitStrategy::Load, Duration::from_secs(10)).await;
        assert_eq!(result, Err(FetchError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let page = ScriptedPage::new(vec![Ok("<html></html>".to_string())]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result =
            fetch_page_html(&page, &cancel, URL, WaitStrategy::Load, Duration::from_secs(5)).await;
        assert_eq!(result, Err(FetchError::Cancelled));
        assert_eq!(page.navigations(), 0);
    }

    #[tokio::test]
    async fn test_navigation_failure_not_retried() {
        let page = ScriptedPage::new(vec![
            Err(PageError::Navigation("net::ERR_NAME_NOT_RESOLVED".to_string())),
            Ok("<html></html>".to_string()),
        ]);
        let cancel = CancellationToken::new();

        let result = fetch_with_retry(
            &page,
            &cancel,
            URL,
            WaitStrategy::Load,
            Duration::from_secs(5),
            1,
        )
        .await;
        assert!(matches!(result, Err(FetchError::Navigation(_))));
        assert_eq!(page.navigations(), 1);
    }

    #[tokio::test]
    async fn test_timeout_retried_once() {
        let page = ScriptedPage::new(vec![
            Err(PageError::Timeout),
            Ok("<html>second</html>".to_string()),
        ]);
        let cancel = CancellationToken::new();

        let html = fetch_with_retry(
            &page,
            &cancel,
            URL,
            WaitStrategy::Load,
            Duration::from_secs(5),
            1,
        )
        .await
        .unwrap();
        assert_eq!(html, "<html>second</html>");
        assert_eq!(page.navigations(), 2);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let page = ScriptedPage::new(vec![
            Err(PageError::TargetClosed("gone".to_string())),
            Err(PageError::TargetClosed("gone".to_string())),
            Ok("<html></html>".to_string()),
        ]);
        let cancel = CancellationToken::new();

        let result = fetch_with_retry(
            &page,
            &cancel,
            URL,
            WaitStrategy::Load,
            Duration::from_secs(5),
            1,
        )
        .await;
        assert!(matches!(result, Err(FetchError::TargetClosed(_))));
        assert_eq!(page.navigations(), 2);
    }

    #[test]
    fn test_classification() {
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!FetchError::Timeout(Duration::from_secs(1)).is_critical());
        assert!(!FetchError::Navigation("x".to_string()).is_retryable());
        assert!(!FetchError::Navigation("x".to_string()).is_critical());
        assert!(!FetchError::EmptyContent.is_critical());
        assert!(FetchError::Cancelled.is_critical());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(FetchError::PageClosed.is_critical());
        assert!(FetchError::BrowserDisconnected("x".to_string()).is_critical());
        assert!(FetchError::TargetClosed("x".to_string()).is_connection_level());
    }

    #[test]
    fn test_navigation_timeout() {
        assert_eq!(
            navigation_timeout(Duration::from_secs(120)),
            Duration::from_secs(115)
        );
        assert_eq!(
            navigation_timeout(Duration::from_secs(3)),
            Duration::from_secs(1)
        );
        assert_eq!(
            navigation_timeout(Duration::from_millis(50)),
            Duration::from_millis(50)
        );
    }
}
