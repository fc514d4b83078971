//! External browser process management
//!
//! The spawned browser serves CDP on a loopback port. Its stdout and stderr
//! are captured so they can be reported when the session fails.

use crate::browser::SessionError;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::Instant;

/// Upper bound on a single readiness dial
const DIAL_TIMEOUT: Duration = Duration::from_millis(500);

/// Captured output is truncated past this many bytes per stream
const MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Picks a free TCP port on the loopback interface
///
/// The port is released before returning, so another process could in
/// principle take it before the browser binds it.
pub fn allocate_port() -> Result<u16, SessionError> {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(SessionError::PortAllocation)?;
    let port = listener
        .local_addr()
        .map_err(SessionError::PortAllocation)?
        .port();
    Ok(port)
}

/// Polls `addr` until it accepts a TCP connection
///
/// Each attempt is bounded by a short dial timeout; attempts are spaced
/// `interval` apart and the final one is made once `max_wait` has elapsed.
///
/// # Returns
///
/// * `Ok(())` - A connection succeeded
/// * `Err(SessionError::BrowserNotReady)` - Nothing listened in time
pub async fn wait_for_port(
    addr: SocketAddr,
    interval: Duration,
    max_wait: Duration,
) -> Result<(), SessionError> {
    let started = Instant::now();
    let deadline = started + max_wait;
    let dial_timeout = DIAL_TIMEOUT.min(max_wait);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Ok(Ok(_stream)) = tokio::time::timeout(dial_timeout, TcpStream::connect(addr)).await
        {
            tracing::debug!(
                "Port {} ready after {} attempt(s) in {:?}",
                addr,
                attempts,
                started.elapsed()
            );
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(SessionError::BrowserNotReady {
                addr,
                waited: started.elapsed(),
            });
        }

        // The last sleep is cut short so one more dial lands on the deadline.
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Captured stdout and stderr of a spawned browser
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub stdout: String,
    pub stderr: String,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }

    /// Writes the captured output to the log at warn level
    pub fn log(&self) {
        if !self.stdout.trim().is_empty() {
            tracing::warn!("Browser stdout:\n{}", self.stdout.trim_end());
        }
        if !self.stderr.trim().is_empty() {
            tracing::warn!("Browser stderr:\n{}", self.stderr.trim_end());
        }
    }
}

/// A browser spawned in CDP server mode
pub struct BrowserProcess {
    child: Child,
    executable: PathBuf,
    port: u16,
    stdout: Arc<Mutex<String>>,
    stderr: Arc<Mutex<String>>,
}

impl BrowserProcess {
    /// Spawns `executable serve --host 127.0.0.1 --port <port>`
    ///
    /// The child is killed if this handle is dropped without `terminate`.
    pub fn spawn(executable: &Path, port: u16) -> Result<Self, SessionError> {
        let mut child = Command::new(executable)
            .arg("serve")
            .arg("--host")
            .arg(Ipv4Addr::LOCALHOST.to_string())
            .arg("--port")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                path: executable.to_path_buf(),
                source,
            })?;

        let stdout = Arc::new(Mutex::new(String::new()));
        let stderr = Arc::new(Mutex::new(String::new()));

        if let Some(out) = child.stdout.take() {
            capture(out, Arc::clone(&stdout));
        }
        if let Some(err) = child.stderr.take() {
            capture(err, Arc::clone(&stderr));
        }

        tracing::info!(
            "Spawned {} (pid {:?}) on port {}",
            executable.display(),
            child.id(),
            port
        );

        Ok(Self {
            child,
            executable: executable.to_path_buf(),
            port,
            stdout,
            stderr,
        })
    }

    /// The loopback address the browser listens on
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }

    /// The DevTools websocket endpoint
    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr())
    }

    /// A snapshot of everything captured so far
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            stdout: read_buffer(&self.stdout),
            stderr: read_buffer(&self.stderr),
        }
    }

    /// Kills the process and waits for it to exit
    ///
    /// Errors are logged, never returned.
    pub async fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!("{} already exited: {}", self.executable.display(), status);
                return;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to poll browser process: {}", e),
        }

        if let Err(e) = self.child.kill().await {
            tracing::warn!(
                "Failed to terminate {}: {}",
                self.executable.display(),
                e
            );
            return;
        }

        match self.child.wait().await {
            Ok(status) => tracing::debug!("Browser process exited: {}", status),
            Err(e) => tracing::warn!("Failed to wait for browser process: {}", e),
        }
    }
}

fn capture<R>(stream: R, buffer: Arc<Mutex<String>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Ok(mut buf) = buffer.lock() {
                if buf.len() + line.len() < MAX_CAPTURE_BYTES {
                    buf.push_str(&line);
                    buf.push('\n');
                }
            }
        }
    });
}

fn read_buffer(buffer: &Mutex<String>) -> String {
    buffer.lock().map(|b| b.clone()).unwrap_or_default()
}
