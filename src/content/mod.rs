//! Content extraction for fetched pages
//!
//! The crawler hands every matching page's rendered HTML to a
//! `ContentProcessor` and keeps whatever record it returns. Processing
//! failures are always treated as skippable by the crawler.

mod readable;

pub use readable::{select_content, strip_noise, ReadabilityProcessor};

use scraper::{Html, Selector};
use thiserror::Error;

/// A saved page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub title: String,
    pub url: String,

    /// Readable content rendered as Markdown
    pub markdown: String,

    /// The full rendered DOM as fetched
    pub raw_html: String,

    /// The HTML of the extracted article
    pub article_html: String,
}

/// Errors that can occur while processing a page
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("invalid page URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid content selector '{0}'")]
    InvalidSelector(String),

    #[error("content extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("no readable content found in {0}")]
    Empty(String),
}

/// Turns rendered HTML into a page record
pub trait ContentProcessor: Send + Sync {
    fn process(
        &self,
        url: &str,
        raw_html: &str,
        content_selector: Option<&str>,
    ) -> Result<PageRecord, ProcessError>;
}

/// Extracts the trimmed `<title>` text of a document
pub fn document_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}
