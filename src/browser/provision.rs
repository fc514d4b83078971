//! Browser executable resolution
//!
//! Installation is out of scope; this only finds an existing executable
//! and checks it is usable before a session is opened.

use crate::config::BrowserKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while locating the browser executable
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("cannot determine a data directory for {kind} on this platform; pass an explicit browser path")]
    UnsupportedPlatform { kind: BrowserKind },

    #[error("{kind} executable not found at {}; {hint}", .path.display())]
    Missing {
        kind: BrowserKind,
        path: PathBuf,
        hint: String,
    },

    #[error("{} is a directory, not an executable", .0.display())]
    NotAFile(PathBuf),

    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A browser ready to be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBrowser {
    pub kind: BrowserKind,

    /// `None` lets the automation library locate Chromium itself
    pub executable: Option<PathBuf>,
}

/// Locates browser executables
pub trait Provisioner: Send + Sync {
    /// Resolves where the executable for `kind` should live
    ///
    /// `Ok(None)` means the backend finds its own executable.
    fn resolve_executable_path(&self, kind: BrowserKind) -> Result<Option<PathBuf>, ProvisionError>;

    /// Resolves and checks the executable, once, before a session opens
    fn prepare(&self, kind: BrowserKind) -> Result<PreparedBrowser, ProvisionError> {
        let executable = self.resolve_executable_path(kind)?;

        if let Some(path) = &executable {
            check_executable(kind, path)?;
        }

        tracing::debug!(
            "Prepared {} browser ({})",
            kind,
            executable
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detected".to_string())
        );

        Ok(PreparedBrowser { kind, executable })
    }
}

/// Finds executables on the local filesystem
///
/// An explicit path always wins. Otherwise Lightpanda is expected at
/// `<data dir>/sumi-scribe/bin/lightpanda` and Chromium is left to the
/// automation library's own detection.
#[derive(Debug, Clone, Default)]
pub struct FsProvisioner {
    explicit_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

impl FsProvisioner {
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self {
            explicit_path,
            data_dir: default_data_dir(),
        }
    }

    /// Overrides the data directory used for installed browsers
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }
}

impl Provisioner for FsProvisioner {
    fn resolve_executable_path(&self, kind: BrowserKind) -> Result<Option<PathBuf>, ProvisionError> {
        if let Some(path) = &self.explicit_path {
            return Ok(Some(path.clone()));
        }

        match kind {
            BrowserKind::Chromium => Ok(None),
            BrowserKind::Lightpanda => {
                let data_dir = self
                    .data_dir
                    .as_ref()
                    .ok_or(ProvisionError::UnsupportedPlatform { kind })?;
                Ok(Some(
                    data_dir
                        .join("sumi-scribe")
                        .join("bin")
                        .join(executable_name(kind)),
                ))
            }
        }
    }
}

fn executable_name(kind: BrowserKind) -> &'static str {
    match (kind, cfg!(windows)) {
        (BrowserKind::Lightpanda, true) => "lightpanda.exe",
        (BrowserKind::Lightpanda, false) => "lightpanda",
        (BrowserKind::Chromium, true) => "chrome.exe",
        (BrowserKind::Chromium, false) => "chromium",
    }
}

fn check_executable(kind: BrowserKind, path: &Path) -> Result<(), ProvisionError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(ProvisionError::NotAFile(path.to_path_buf())),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ProvisionError::Missing {
            kind,
            path: path.to_path_buf(),
            hint: format!(
                "install {} at this location or pass its path with --browser-path",
                kind
            ),
        }),
        Err(source) => Err(ProvisionError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Returns the per-user data directory for this platform
///
/// `$XDG_DATA_HOME` or `~/.local/share` on Linux, `~/Library/Application
/// Support` on macOS and `%APPDATA%` on Windows.
pub fn default_data_dir() -> Option<PathBuf> {
    let non_empty = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty());

    if cfg!(windows) {
        return non_empty("APPDATA").map(PathBuf::from);
    }

    let home = non_empty("HOME").map(PathBuf::from);

    if cfg!(target_os = "macos") {
        return home.map(|h| h.join("Library").join("Application Support"));
    }

    non_empty("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| home.map(|h| h.join(".local").join("share")))
}
