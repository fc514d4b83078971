use crate::config::types::{BrowserConfig, Config, CrawlConfig};
use crate::url::PatternSet;
use crate::ConfigError;
use scraper::Selector;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_browser_config(&config.browser)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    PatternSet::compile(&config.match_patterns)?;
    PatternSet::compile(&config.follow_patterns)?;

    if let Some(selector) = &config.content_selector {
        validate_selector(selector)?;
    }

    if config.fetch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetch_timeout_ms must be greater than 0".to_string(),
        ));
    }

    if config.max_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 0 and 5, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    let timeouts = [
        ("ready_poll_interval_ms", config.ready_poll_interval_ms),
        ("ready_timeout_ms", config.ready_timeout_ms),
        ("connect_timeout_ms", config.connect_timeout_ms),
        ("launch_timeout_ms", config.launch_timeout_ms),
        ("request_timeout_ms", config.request_timeout_ms),
        ("probe_timeout_ms", config.probe_timeout_ms),
    ];

    for (name, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{} must be greater than 0",
                name
            )));
        }
    }

    if config.ready_poll_interval_ms > config.ready_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "ready_poll_interval_ms ({}) must not exceed ready_timeout_ms ({})",
            config.ready_poll_interval_ms, config.ready_timeout_ms
        )));
    }

    if let Some(path) = &config.executable_path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "executable_path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a CSS content selector
pub fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(
            "selector cannot be empty".to_string(),
        ));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_match_pattern() {
        let mut config = Config::default();
        config.crawl.match_patterns = vec!["/a/[".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_invalid_follow_pattern() {
        let mut config = Config::default();
        config.crawl.follow_patterns = vec!["/ok/*".to_string(), "{unclosed".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_valid_selector() {
        assert!(validate_selector("main article.content").is_ok());
        assert!(validate_selector("#root > div").is_ok());
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            validate_selector("div[[["),
            Err(ConfigError::InvalidSelector(_))
        ));
        assert!(validate_selector("   ").is_err());
    }

    #[test]
    fn test_zero_fetch_timeout() {
        let mut config = Config::default();
        config.crawl.fetch_timeout_ms = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_too_many_retries() {
        let mut config = Config::default();
        config.crawl.max_retries = 6;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_poll_interval() {
        let mut config = Config::default();
        config.browser.ready_poll_interval_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_poll_interval_exceeds_wait() {
        let mut config = Config::default();
        config.browser.ready_poll_interval_ms = 20_000;
        config.browser.ready_timeout_ms = 10_000;
        assert!(validate(&config).is_err());
    }
}
