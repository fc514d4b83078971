//! JSON record rendering

use crate::content::PageRecord;
use crate::output::traits::OutputResult;
use serde::Serialize;

#[derive(Serialize)]
struct JsonPage<'a> {
    title: &'a str,
    url: &'a str,
    content: &'a str,
}

/// Renders records as a pretty-printed JSON array
///
/// No records render as `[]`.
pub fn format_records_json(records: &[PageRecord]) -> OutputResult<Vec<u8>> {
    if records.is_empty() {
        return Ok(b"[]".to_vec());
    }

    let pages: Vec<JsonPage<'_>> = records
        .iter()
        .map(|record| JsonPage {
            title: &record.title,
            url: &record.url,
            content: &record.markdown,
        })
        .collect();

    Ok(serde_json::to_vec_pretty(&pages)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_empty_array() {
        assert_eq!(format_records_json(&[]).unwrap(), b"[]");
    }

    #[test]
    fn test_fields_and_order() {
        let records = vec![
            PageRecord {
                title: "One".to_string(),
                url: "http://x.com/1".to_string(),
                markdown: "# One".to_string(),
                raw_html: "<html>ignored</html>".to_string(),
                article_html: "<p>ignored</p>".to_string(),
            },
            PageRecord {
                title: "Two \"quoted\"".to_string(),
                url: "http://x.com/2".to_string(),
                markdown: "line\nbreak".to_string(),
                raw_html: String::new(),
                article_html: String::new(),
            },
        ];

        let bytes = format_records_json(&records).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let pages = parsed.as_array().unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0]["title"], "One");
        assert_eq!(pages[0]["url"], "http://x.com/1");
        assert_eq!(pages[0]["content"], "# One");
        assert!(pages[0].get("raw_html").is_none());
        assert_eq!(pages[1]["title"], "Two \"quoted\"");
        assert_eq!(pages[1]["content"], "line\nbreak");
    }

    #[test]
    fn test_pretty_printed() {
        let records = vec![PageRecord {
            title: "T".to_string(),
            url: "u".to_string(),
            markdown: "c".to_string(),
            raw_html: String::new(),
            article_html: String::new(),
        }];
        let text = String::from_utf8(format_records_json(&records).unwrap()).unwrap();
        assert!(text.starts_with("[\n  {\n    \"title\": \"T\""));
    }
}
