use crate::content::{document_title, ContentProcessor, PageRecord, ProcessError};
use scraper::{Html, Selector};
use url::Url;

/// Elements dropped before extraction when no content selector is given
const NOISE_SELECTOR: &str = "script, style, link, img, video";

/// Readability extraction followed by Markdown conversion
///
/// With a content selector the first matching element is extracted;
/// otherwise the whole page is used after scripts, styles and media are
/// removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityProcessor;

impl ReadabilityProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentProcessor for ReadabilityProcessor {
    fn process(
        &self,
        url: &str,
        raw_html: &str,
        content_selector: Option<&str>,
    ) -> Result<PageRecord, ProcessError> {
        let page_url = Url::parse(url).map_err(|e| ProcessError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let source = match content_selector {
            Some(selector) => match select_content(raw_html, selector)? {
                Some(fragment) => fragment,
                None => {
                    tracing::warn!(
                        "Selector '{}' matched nothing on {}, using the full page",
                        selector,
                        url
                    );
                    strip_noise(raw_html)
                }
            },
            None => strip_noise(raw_html),
        };

        let product = readability::extractor::extract(&mut source.as_bytes(), &page_url)
            .map_err(|e| ProcessError::Extraction {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let markdown = html2md::parse_html(&product.content).trim().to_string();
        if markdown.is_empty() {
            return Err(ProcessError::Empty(url.to_string()));
        }

        let title = match product.title.trim() {
            "" => document_title(raw_html).unwrap_or_default(),
            title => title.to_string(),
        };

        Ok(PageRecord {
            title,
            url: url.to_string(),
            markdown,
            raw_html: raw_html.to_string(),
            article_html: product.content,
        })
    }
}

/// Returns the outer HTML of the first element matching `selector`
///
/// # Returns
///
/// * `Ok(Some(String))` - The first match
/// * `Ok(None)` - Nothing matched
/// * `Err(ProcessError::InvalidSelector)` - The selector does not parse
pub fn select_content(html: &str, selector: &str) -> Result<Option<String>, ProcessError> {
    let selector =
        Selector::parse(selector).map_err(|_| ProcessError::InvalidSelector(selector.to_string()))?;
    let document = Html::parse_document(html);

    Ok(document.select(&selector).next().map(|element| element.html()))
}

/// Removes scripts, styles, stylesheet links and media from a document
pub fn strip_noise(html: &str) -> String {
    let mut document = Html::parse_document(html);

    if let Ok(noise) = Selector::parse(NOISE_SELECTOR) {
        let ids: Vec<_> = document.select(&noise).map(|element| element.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    document.html()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"
        <html>
        <head>
            <title>Field Notes</title>
            <style>body { color: red; }</style>
            <script>window.tracking = true;</script>
        </head>
        <body>
            <nav><a href="/">Home</a></nav>
            <main>
                <h1>Field Notes</h1>
                <p>The heron waited at the edge of the reeds for most of the morning, perfectly still.</p>
                <p>When the mist lifted the whole marsh turned silver and the heron finally struck.</p>
                <img src="/heron.jpg">
            </main>
        </body>
        </html>
    "#;

    #[test]
    fn test_strip_noise_removes_scripts_and_media() {
        let cleaned = strip_noise(ARTICLE);
        assert!(!cleaned.contains("window.tracking"));
        assert!(!cleaned.contains("color: red"));
        assert!(!cleaned.contains("heron.jpg"));
        assert!(cleaned.contains("perfectly still"));
    }

    #[test]
    fn test_select_content_first_match() {
        let html = r#"<div class="c">one</div><div class="c">two</div>"#;
        let selected = select_content(html, "div.c").unwrap().unwrap();
        assert_eq!(selected, r#"<div class="c">one</div>"#);
    }

    #[test]
    fn test_select_content_no_match() {
        let selected = select_content(ARTICLE, "article.missing").unwrap();
        assert!(selected.is_none());
    }

    #[test]
    fn test_select_content_invalid_selector() {
        let result = select_content(ARTICLE, "div[[[");
        assert!(matches!(result, Err(ProcessError::InvalidSelector(_))));
    }

    #[test]
    fn test_process_produces_markdown() {
        let record = ReadabilityProcessor::new()
            .process("https://example.com/notes", ARTICLE, None)
            .unwrap();

        assert_eq!(record.url, "https://example.com/notes");
        assert_eq!(record.title, "Field Notes");
        assert!(record.markdown.contains("heron"));
        assert!(!record.markdown.contains("window.tracking"));
        assert_eq!(record.raw_html, ARTICLE);
    }

    #[test]
    fn test_process_with_selector() {
        let record = ReadabilityProcessor::new()
            .process("https://example.com/notes", ARTICLE, Some("main"))
            .unwrap();
        assert!(record.markdown.contains("marsh"));
    }

    #[test]
    fn test_process_rejects_invalid_url() {
        let result = ReadabilityProcessor::new().process("not a url", ARTICLE, None);
        assert!(matches!(result, Err(ProcessError::InvalidUrl { .. })));
    }
}
