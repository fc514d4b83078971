use crate::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Sumi-Scribe
///
/// Every section falls back to its defaults, so an empty file (or no file
/// at all) is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Globs deciding which fetched pages have their content saved
    #[serde(rename = "match")]
    pub match_patterns: Vec<String>,

    /// Globs deciding which discovered links are queued
    #[serde(rename = "follow-match")]
    pub follow_patterns: Vec<String>,

    /// Maximum number of saved pages; 0 means unbounded
    #[serde(rename = "limit")]
    pub result_cap: usize,

    /// CSS selector narrowing the content handed to the extractor
    pub content_selector: Option<String>,

    /// What a navigation waits for before the DOM is read
    pub wait: WaitStrategy,

    /// Ceiling for a single fetch, navigation and DOM read included (milliseconds)
    pub fetch_timeout_ms: u64,

    /// Extra attempts for timeout-class or connection-level fetch failures
    pub max_retries: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            match_patterns: Vec::new(),
            follow_patterns: Vec::new(),
            result_cap: 0,
            content_selector: None,
            wait: WaitStrategy::Load,
            fetch_timeout_ms: 120_000,
            max_retries: 1,
        }
    }
}

impl CrawlConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Browser backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserConfig {
    /// Which backend drives the session
    pub kind: BrowserKind,

    /// Explicit path to the browser executable
    pub executable_path: Option<PathBuf>,

    /// Delay between readiness probes of a spawned browser (milliseconds)
    pub ready_poll_interval_ms: u64,

    /// Total time a spawned browser gets to open its port (milliseconds)
    pub ready_timeout_ms: u64,

    /// Timeout for the automation handshake (milliseconds)
    pub connect_timeout_ms: u64,

    /// Timeout for a managed browser launch (milliseconds)
    pub launch_timeout_ms: u64,

    /// Timeout for the response to a single protocol command (milliseconds)
    ///
    /// Navigation commits are bounded by this, so it should not be shorter
    /// than the fetch ceiling.
    pub request_timeout_ms: u64,

    /// Timeout for the blank-page liveness probe (milliseconds)
    pub probe_timeout_ms: u64,

    /// Forward the spawned browser's output to the log
    pub verbose: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            executable_path: None,
            ready_poll_interval_ms: 200,
            ready_timeout_ms: 10_000,
            connect_timeout_ms: 30_000,
            launch_timeout_ms: 30_000,
            request_timeout_ms: 120_000,
            probe_timeout_ms: 15_000,
            verbose: false,
        }
    }
}

impl BrowserConfig {
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// File to write records to; stdout when absent
    pub path: Option<PathBuf>,

    /// Record encoding; inferred from `path` when absent
    pub format: Option<OutputFormat>,
}

impl OutputConfig {
    /// Resolves the record encoding
    ///
    /// An explicit format wins. Otherwise a path ending in `.json` selects
    /// JSON and everything else falls back to XML.
    pub fn resolved_format(&self) -> OutputFormat {
        if let Some(format) = self.format {
            return format;
        }

        match &self.path {
            Some(path)
                if path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false) =>
            {
                OutputFormat::Json
            }
            _ => OutputFormat::Xml,
        }
    }
}

/// Browser backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chromium launched and managed by the automation library
    #[default]
    Chromium,

    /// Lightpanda spawned as a CDP server on a loopback port
    Lightpanda,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Lightpanda => "lightpanda",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Self::Chromium),
            "lightpanda" => Ok(Self::Lightpanda),
            other => Err(ConfigError::Validation(format!(
                "unknown browser '{}', expected 'chromium' or 'lightpanda'",
                other
            ))),
        }
    }
}

/// Navigation completion condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitStrategy {
    /// The load event has fired
    #[default]
    Load,

    /// The network has been quiet after load
    NetworkIdle,
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::NetworkIdle => f.write_str("network-idle"),
        }
    }
}

/// Encoding of the emitted page records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xml,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml => f.write_str("xml"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unknown output format '{}', expected 'xml' or 'json'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.crawl.fetch_timeout(), Duration::from_secs(120));
        assert_eq!(config.crawl.max_retries, 1);
        assert_eq!(config.crawl.result_cap, 0);
        assert_eq!(config.crawl.wait, WaitStrategy::Load);
        assert_eq!(config.browser.kind, BrowserKind::Chromium);
        assert_eq!(config.browser.ready_poll_interval(), Duration::from_millis(200));
        assert_eq!(config.browser.ready_timeout(), Duration::from_secs(10));
        assert_eq!(config.browser.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.browser.probe_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_browser_kind_from_str() {
        assert_eq!("chromium".parse::<BrowserKind>().unwrap(), BrowserKind::Chromium);
        assert_eq!(
            "Lightpanda".parse::<BrowserKind>().unwrap(),
            BrowserKind::Lightpanda
        );
        assert!("firefox".parse::<BrowserKind>().is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("XML".parse::<OutputFormat>().unwrap(), OutputFormat::Xml);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_inferred_from_json_extension() {
        let output = OutputConfig {
            path: Some(PathBuf::from("results.JSON")),
            format: None,
        };
        assert_eq!(output.resolved_format(), OutputFormat::Json);
    }

    #[test]
    fn test_format_defaults_to_xml() {
        let output = OutputConfig {
            path: Some(PathBuf::from("results.txt")),
            format: None,
        };
        assert_eq!(output.resolved_format(), OutputFormat::Xml);
        assert_eq!(OutputConfig::default().resolved_format(), OutputFormat::Xml);
    }

    #[test]
    fn test_explicit_format_wins() {
        let output = OutputConfig {
            path: Some(PathBuf::from("results.json")),
            format: Some(OutputFormat::Xml),
        };
        assert_eq!(output.resolved_format(), OutputFormat::Xml);
    }
}
