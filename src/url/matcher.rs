use crate::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// A compiled set of path globs
///
/// Patterns use `/` as the segment separator: `*` matches within a single
/// path segment and `**` matches across segments. An empty set matches
/// every path.
///
/// # Examples
///
/// ```
/// use sumi_scribe::url::PatternSet;
///
/// let patterns = PatternSet::compile(&["/blog/*".to_string()]).unwrap();
/// assert!(patterns.matches("/blog/post"));
/// assert!(!patterns.matches("/blog/post/edit"));
/// ```
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: GlobSet,
    sources: Vec<String>,
}

impl PatternSet {
    /// Compiles glob patterns into a matcher
    ///
    /// # Returns
    ///
    /// * `Ok(PatternSet)` - All patterns compiled
    /// * `Err(ConfigError::InvalidPattern)` - A pattern has invalid syntax
    pub fn compile(patterns: &[String]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
            builder.add(glob);
        }

        let set = builder
            .build()
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            set,
            sources: patterns.to_vec(),
        })
    }

    /// A set with no patterns, which matches everything
    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
            sources: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The patterns this set was compiled from
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Returns true if the path matches any pattern, or if the set is empty
    ///
    /// An empty path is treated as `/`.
    pub fn matches(&self, path: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        let path = if path.is_empty() { "/" } else { path };
        self.set.is_match(path)
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Decides whether a fetched page's content should be extracted and saved
///
/// # Arguments
///
/// * `path` - The URL path of the fetched page
/// * `patterns` - The match patterns; empty means "everything"
pub fn should_process_content(path: &str, patterns: &PatternSet) -> bool {
    patterns.matches(path)
}
