use crate::UrlError;
use url::Url;

/// Canonicalizes a URL into the string form used as the visitation key
///
/// # Canonicalization Steps
///
/// 1. Trim surrounding whitespace; reject empty input and bare fragments
/// 2. Parse the URL; reject if malformed or relative
/// 3. Remove fragment (everything after #)
/// 4. If the URL has a host and an empty path, set the path to /
/// 5. Remove a single trailing slash from paths longer than /
///
/// The query string is kept as-is. Two inputs that canonicalize to the same
/// string are the same page as far as the crawler is concerned.
///
/// # Examples
///
/// ```
/// use sumi_scribe::url::canonicalize;
///
/// assert_eq!(canonicalize("http://x.com").unwrap(), "http://x.com/");
/// assert_eq!(canonicalize("http://x.com/a/#top").unwrap(), "http://x.com/a");
/// ```
pub fn canonicalize(raw: &str) -> Result<String, UrlError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(invalid(raw, "empty URL"));
    }

    if trimmed.starts_with('#') {
        return Err(invalid(raw, "bare fragment"));
    }

    let mut url = Url::parse(trimmed).map_err(|e| invalid(raw, &e.to_string()))?;

    url.set_fragment(None);

    if url.has_host() && url.path().is_empty() {
        url.set_path("/");
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path[..path.len() - 1].to_string();
        url.set_path(&stripped);
    }

    Ok(url.to_string())
}

fn invalid(input: &str, reason: &str) -> UrlError {
    UrlError::Invalid {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
