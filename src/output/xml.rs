//! XML-like record rendering
//!
//! Field values are written verbatim, without escaping, so Markdown stays
//! readable when the output is fed to other tools.

use crate::content::PageRecord;

/// Renders one record as a `<page>` block
pub fn format_page_xml(record: &PageRecord) -> String {
    format!(
        "<page>\n  <title>{}</title>\n  <url>{}</url>\n  <content>\n{}\n  </content>\n</page>",
        record.title, record.url, record.markdown
    )
}

/// Renders all records, separated by a blank line
///
/// No records render as an empty string.
pub fn format_records_xml(records: &[PageRecord]) -> String {
    records
        .iter()
        .map(format_page_xml)
        .collect::<Vec<_>>()
        .join("\n\n")
}
