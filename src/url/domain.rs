use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_scribe::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if the URL's host equals `host` (case-insensitive)
///
/// Ports are ignored; only the hostname is compared.
pub fn is_same_host(url: &Url, host: &str) -> bool {
    url.host_str()
        .map(|h| h.eq_ignore_ascii_case(host))
        .unwrap_or(false)
}
