//! Cancellation sources
//!
//! A source resolves once, when something asks the crawl to stop. `watch`
//! turns that into a one-way `CancellationToken` flip; anything the source
//! would deliver afterwards is ignored.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Something that can request cancellation
#[async_trait]
pub trait CancellationSource: Send + 'static {
    /// Resolves when cancellation is requested, with a short description
    async fn requested(&mut self) -> String;
}

/// Ctrl-C, plus SIGTERM on Unix
#[derive(Debug, Default)]
pub struct SignalSource;

#[async_trait]
impl CancellationSource for SignalSource {
    async fn requested(&mut self) -> String {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut terminate) => {
                    tokio::select! {
                        reason = interrupt() => reason,
                        _ = terminate.recv() => "terminate signal".to_string(),
                    }
                }
                Err(e) => {
                    tracing::warn!("Cannot listen for SIGTERM: {}", e);
                    interrupt().await
                }
            }
        }

        #[cfg(not(unix))]
        {
            interrupt().await
        }
    }
}

async fn interrupt() -> String {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "interrupt signal".to_string(),
        Err(e) => {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending().await
        }
    }
}

/// Fires once a fixed duration has elapsed
#[derive(Debug, Clone, Copy)]
pub struct DelaySource(pub Duration);

#[async_trait]
impl CancellationSource for DelaySource {
    async fn requested(&mut self) -> String {
        tokio::time::sleep(self.0).await;
        format!("time limit of {:?} reached", self.0)
    }
}

/// Fires when a value is sent on the paired sender
///
/// A dropped sender never fires.
#[derive(Debug)]
pub struct ChannelSource(oneshot::Receiver<()>);

impl ChannelSource {
    pub fn pair() -> (oneshot::Sender<()>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self(rx))
    }
}

#[async_trait]
impl CancellationSource for ChannelSource {
    async fn requested(&mut self) -> String {
        match (&mut self.0).await {
            Ok(()) => "cancellation requested".to_string(),
            Err(_) => std::future::pending().await,
        }
    }
}

/// Cancels `token` the first time `source` fires
///
/// The task also ends quietly if the token is cancelled some other way.
pub fn watch<S: CancellationSource>(mut source: S, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            reason = source.requested() => {
                tracing::info!("Stopping: {}. Saving collected pages...", reason);
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}
