//! Sumi-Scribe main entry point
//!
//! This is the command-line interface for the Sumi-Scribe site scraper.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use sumi_scribe::browser::FsProvisioner;
use sumi_scribe::config::{
    load_config_with_hash, read_url_list, validate, BrowserKind, Config, OutputFormat,
    WaitStrategy,
};
use sumi_scribe::crawler::{run, watch, SeedMode, SignalSource};
use sumi_scribe::output::print_summary;
use sumi_scribe::TerminalStatus;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Scribe: scrape a site's readable content with a headless browser
///
/// Starting from one URL, Sumi-Scribe follows same-host links breadth-first,
/// renders every page in a headless browser and saves its readable content
/// as Markdown wrapped in XML or JSON records.
#[derive(Parser, Debug)]
#[command(name = "sumi-scribe")]
#[command(version = "1.0.0")]
#[command(about = "Scrape a site's readable content with a headless browser", long_about = None)]
struct Cli {
    /// Start URL; links on the same host are followed
    #[arg(value_name = "URL", required_unless_present = "url_file")]
    url: Option<String>,

    /// Read URLs from a file, one per line, and scrape only those
    #[arg(long, value_name = "FILE", conflicts_with = "url")]
    url_file: Option<PathBuf>,

    /// Write records to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    outfile: Option<PathBuf>,

    /// Record format (inferred from the outfile extension when absent)
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Only save pages whose path matches this glob (repeatable)
    #[arg(short, long = "match", value_name = "GLOB")]
    match_patterns: Vec<String>,

    /// Only follow links whose path matches this glob (repeatable)
    #[arg(long = "follow-match", value_name = "GLOB")]
    follow_patterns: Vec<String>,

    /// Stop after this many saved pages
    #[arg(short, long, value_name = "N")]
    limit: Option<usize>,

    /// CSS selector for the element holding the main content
    #[arg(long, value_name = "SELECTOR")]
    content_selector: Option<String>,

    /// Wait for network idle instead of the load event
    #[arg(short, long)]
    wait_for_network_idle: bool,

    /// Browser backend (chromium or lightpanda)
    #[arg(short, long, value_name = "KIND", env = "SUMI_SCRIBE_BROWSER")]
    browser: Option<BrowserKind>,

    /// Path to the browser executable
    #[arg(long, value_name = "PATH")]
    browser_path: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Forward the browser's own output to the log
    #[arg(long)]
    verbose_browser: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable logging entirely
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    silent: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.silent);

    let config = build_config(&cli)?;
    let seeds = seed_mode(&cli)?;

    let cancel = CancellationToken::new();
    let listener = watch(SignalSource, cancel.clone());

    let provisioner = FsProvisioner::new(config.browser.executable_path.clone());
    let result = run(seeds, &config, &provisioner, cancel).await;
    listener.abort();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&report.summary);

    if report.status == TerminalStatus::Failed {
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout only ever carries records.
fn setup_logging(verbose: u8, silent: bool) {
    let filter = if silent {
        EnvFilter::new("off")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_scribe=info,warn"),
            1 => EnvFilter::new("sumi_scribe=debug,info"),
            2 => EnvFilter::new("sumi_scribe=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the run configuration: defaults, then the config file, then flags
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if !cli.match_patterns.is_empty() {
        config.crawl.match_patterns = cli.match_patterns.clone();
    }
    if !cli.follow_patterns.is_empty() {
        config.crawl.follow_patterns = cli.follow_patterns.clone();
    }
    if let Some(limit) = cli.limit {
        config.crawl.result_cap = limit;
    }
    if let Some(selector) = &cli.content_selector {
        config.crawl.content_selector = Some(selector.clone());
    }
    if cli.wait_for_network_idle {
        config.crawl.wait = WaitStrategy::NetworkIdle;
    }
    if let Some(kind) = cli.browser {
        config.browser.kind = kind;
    }
    if let Some(path) = &cli.browser_path {
        config.browser.executable_path = Some(path.clone());
    }
    if cli.verbose_browser {
        config.browser.verbose = true;
    }
    if let Some(path) = &cli.outfile {
        config.output.path = Some(path.clone());
    }
    if let Some(format) = cli.format {
        config.output.format = Some(format);
    }

    validate(&config).context("invalid configuration")?;

    tracing::debug!(
        "Browser: {}, wait: {:?}, limit: {}, output: {} ({})",
        config.browser.kind,
        config.crawl.wait,
        config.crawl.result_cap,
        config
            .output
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string()),
        config.output.resolved_format()
    );

    Ok(config)
}

/// Picks single-seed or list mode from the arguments
fn seed_mode(cli: &Cli) -> anyhow::Result<SeedMode> {
    match (&cli.url, &cli.url_file) {
        (Some(_), Some(_)) => anyhow::bail!("a start URL and --url-file cannot be combined"),
        (Some(url), None) => Ok(SeedMode::SingleSeed(url.clone())),
        (None, Some(path)) => {
            let urls = read_url_list(path)
                .with_context(|| format!("failed to read URLs from {}", path.display()))?;
            tracing::info!("Read {} URL(s) from {}", urls.len(), path.display());
            Ok(SeedMode::FixedList(urls))
        }
        (None, None) => anyhow::bail!("a start URL or --url-file is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_single_url() {
        let cli = Cli::try_parse_from(["sumi-scribe", "https://example.com", "-l", "3"]).unwrap();
        assert_eq!(cli.limit, Some(3));
        assert!(matches!(seed_mode(&cli).unwrap(), SeedMode::SingleSeed(_)));
    }

    #[test]
    fn test_cli_url_and_file_conflict() {
        let result = Cli::try_parse_from([
            "sumi-scribe",
            "https://example.com",
            "--url-file",
            "urls.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_input() {
        assert!(Cli::try_parse_from(["sumi-scribe"]).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "sumi-scribe",
            "https://example.com",
            "-m",
            "/docs/**",
            "-m",
            "/guide/*",
            "--follow-match",
            "/docs/**",
            "-w",
            "-b",
            "lightpanda",
            "-o",
            "out.json",
        ])
        .unwrap();

        let config = build_config(&cli).unwrap();
        assert_eq!(config.crawl.match_patterns.len(), 2);
        assert_eq!(config.crawl.follow_patterns, vec!["/docs/**".to_string()]);
        assert_eq!(config.crawl.wait, WaitStrategy::NetworkIdle);
        assert_eq!(config.browser.kind, BrowserKind::Lightpanda);
        assert_eq!(config.output.resolved_format(), OutputFormat::Json);
    }

    #[test]
    fn test_cli_rejects_bad_pattern() {
        let cli = Cli::try_parse_from(["sumi-scribe", "https://example.com", "-m", "["]).unwrap();
        assert!(build_config(&cli).is_err());
    }
}
