//! Browser session lifecycle
//!
//! Both backends produce the same `BrowserSession`: a live connection plus
//! one health-checked page. Teardown closes the page, then the connection,
//! then the spawned process, whichever exit path the crawl took.

use crate::browser::launch::{allocate_port, wait_for_port, BrowserProcess, Diagnostics};
use crate::browser::page::CdpPage;
use crate::browser::provision::PreparedBrowser;
use crate::browser::{BrowserPage, PageError};
use crate::config::{BrowserConfig, BrowserKind, WaitStrategy};
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser, Handler};
use futures::StreamExt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// How long a managed browser gets to exit after the close command
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Errors that can occur while opening a browser session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to allocate a local port: {0}")]
    PortAllocation(#[source] std::io::Error),

    #[error("failed to spawn browser {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("browser did not accept connections on {addr} within {waited:?}")]
    BrowserNotReady { addr: SocketAddr, waited: Duration },

    #[error("failed to connect to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("session initialization failed: {0}")]
    Init(String),
}

/// Which backend owns the browser process
enum Backend {
    /// Spawned by us and reached over a loopback port
    External(BrowserProcess),

    /// Launched and owned by the automation library
    Managed,
}

/// A live browser connection with its single page
pub struct BrowserSession {
    page: Arc<CdpPage>,
    browser: Browser,
    handler: JoinHandle<()>,
    backend: Backend,
    verbose: bool,
}

impl BrowserSession {
    /// Opens and health-checks a session for the prepared browser
    ///
    /// # Returns
    ///
    /// * `Ok(BrowserSession)` - The page navigated to a blank document and answered a title request
    /// * `Err(SessionError)` - Anything acquired so far has already been released
    pub async fn open(
        prepared: &PreparedBrowser,
        config: &BrowserConfig,
    ) -> Result<Self, SessionError> {
        match prepared.kind {
            BrowserKind::Lightpanda => Self::open_external(prepared, config).await,
            BrowserKind::Chromium => Self::open_managed(prepared, config).await,
        }
    }

    async fn open_external(
        prepared: &PreparedBrowser,
        config: &BrowserConfig,
    ) -> Result<Self, SessionError> {
        let executable = prepared.executable.as_deref().ok_or_else(|| {
            SessionError::Launch(format!("no executable resolved for {}", prepared.kind))
        })?;

        let port = allocate_port()?;
        let mut process = BrowserProcess::spawn(executable, port)?;

        if let Err(e) =
            wait_for_port(process.addr(), config.ready_poll_interval(), config.ready_timeout())
                .await
        {
            process.diagnostics().log();
            process.terminate().await;
            return Err(e);
        }

        let endpoint = process.endpoint();
        tracing::debug!("Connecting to {}", endpoint);

        let connected = match tokio::time::timeout(
            config.connect_timeout(),
            Browser::connect_with_config(
                endpoint.clone(),
                HandlerConfig {
                    request_timeout: config.request_timeout(),
                    ..HandlerConfig::default()
                },
            ),
        )
        .await
        {
            Ok(Ok(pair)) => Ok(pair),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", config.connect_timeout())),
        };

        match connected {
            Ok((browser, handler)) => {
                Self::establish(prepared.kind, Backend::External(process), browser, handler, config)
                    .await
            }
            Err(reason) => {
                process.diagnostics().log();
                process.terminate().await;
                Err(SessionError::Connection { endpoint, reason })
            }
        }
    }

    async fn open_managed(
        prepared: &PreparedBrowser,
        config: &BrowserConfig,
    ) -> Result<Self, SessionError> {
        let mut builder = chromiumoxide::BrowserConfig::builder()
            .launch_timeout(config.launch_timeout())
            .request_timeout(config.request_timeout());

        if let Some(path) = &prepared.executable {
            builder = builder.chrome_executable(path);
        }

        let launch_config = builder.build().map_err(SessionError::Launch)?;

        let (browser, handler) = Browser::launch(launch_config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        Self::establish(prepared.kind, Backend::Managed, browser, handler, config).await
    }

    /// Post-connection setup shared by both backends
    async fn establish(
        kind: BrowserKind,
        backend: Backend,
        mut browser: Browser,
        handler: Handler,
        config: &BrowserConfig,
    ) -> Result<Self, SessionError> {
        let connected = Arc::new(AtomicBool::new(true));
        let handler = spawn_handler_task(handler, Arc::clone(&connected));

        // Pages are created in the browser's default context.
        let page = match tokio::time::timeout(
            config.probe_timeout(),
            browser.new_page("about:blank"),
        )
        .await
        {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                release(&mut browser, handler, backend, true).await;
                return Err(SessionError::Init(format!("failed to create page: {}", e)));
            }
            Err(_) => {
                release(&mut browser, handler, backend, true).await;
                return Err(SessionError::Init(format!(
                    "page creation timed out after {:?}",
                    config.probe_timeout()
                )));
            }
        };

        let session = Self {
            page: Arc::new(CdpPage::new(page, connected)),
            browser,
            handler,
            backend,
            verbose: config.verbose,
        };

        if let Err(e) = session.probe(config.probe_timeout()).await {
            session.log_failure();
            session.cleanup().await;
            return Err(SessionError::Init(format!("liveness probe failed: {}", e)));
        }

        tracing::info!("{} session ready", kind);
        Ok(session)
    }

    async fn probe(&self, timeout: Duration) -> Result<(), PageError> {
        self.page
            .navigate("about:blank", WaitStrategy::Load, timeout)
            .await?;

        let title = tokio::time::timeout(timeout, self.page.title())
            .await
            .map_err(|_| PageError::Timeout)??;
        tracing::debug!("Probe page title: {:?}", title.unwrap_or_default());
        Ok(())
    }

    /// The page all fetches go through
    pub fn page(&self) -> Arc<dyn BrowserPage> {
        self.page.clone()
    }

    /// Captured output of a spawned browser, if this session spawned one
    pub fn diagnostics(&self) -> Option<Diagnostics> {
        match &self.backend {
            Backend::External(process) => Some(process.diagnostics()),
            Backend::Managed => None,
        }
    }

    /// Logs the spawned browser's captured output
    pub fn log_failure(&self) {
        if let Some(diagnostics) = self.diagnostics() {
            diagnostics.log();
        }
    }

    /// Tears the session down: page, then connection, then process
    ///
    /// Each step logs its own failure and the next step still runs.
    pub async fn cleanup(self) {
        let Self {
            page,
            mut browser,
            handler,
            backend,
            verbose,
            ..
        } = self;

        if !page.is_closed() {
            if let Err(e) = page.close().await {
                tracing::warn!("Failed to close page: {}", e);
            }
        }

        if verbose {
            if let Backend::External(process) = &backend {
                let diagnostics = process.diagnostics();
                if !diagnostics.is_empty() {
                    tracing::debug!(
                        "Browser output:\n{}{}",
                        diagnostics.stdout,
                        diagnostics.stderr
                    );
                }
            }
        }

        release(&mut browser, handler, backend, false).await;
        tracing::debug!("Browser session closed");
    }
}

/// Closes the connection, stops the handler and ends the process
async fn release(browser: &mut Browser, handler: JoinHandle<()>, backend: Backend, failed: bool) {
    if let Err(e) = browser.close().await {
        tracing::warn!("Failed to close browser connection: {}", e);
    }
    handler.abort();

    match backend {
        Backend::Managed => match tokio::time::timeout(EXIT_GRACE, browser.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("Failed to wait for browser exit: {}", e),
            Err(_) => {
                if let Some(Err(e)) = browser.kill().await {
                    tracing::warn!("Failed to kill browser: {}", e);
                }
            }
        },
        Backend::External(mut process) => {
            if failed {
                process.diagnostics().log();
            }
            process.terminate().await;
        }
    }
}

/// Drives the connection handler until it ends, then marks the connection lost
fn spawn_handler_task(mut handler: Handler, connected: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::trace!("Browser handler event error: {}", e);
            }
        }
        connected.store(false, Ordering::SeqCst);
        tracing::debug!("Browser connection handler stopped");
    })
}
