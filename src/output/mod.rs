//! Output module for emitting page records and run summaries
//!
//! This module handles:
//! - Rendering records as XML-like blocks or a JSON array
//! - Writing them to stdout or a file
//! - The end-of-run summary on stderr

mod json;
mod summary;
mod traits;
mod xml;

pub use crate::config::OutputFormat;
pub use json::format_records_json;
pub use summary::{format_summary, print_summary};
pub use traits::{CrawlSummary, OutputError, OutputHandler, OutputResult};
pub use xml::{format_page_xml, format_records_xml};

use crate::config::OutputConfig;
use crate::content::PageRecord;
use std::io::Write;
use std::path::PathBuf;

/// Where encoded records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

/// Encodes records and writes them to stdout or a file
#[derive(Debug, Clone)]
pub struct RecordWriter {
    format: OutputFormat,
    destination: Destination,
}

impl RecordWriter {
    pub fn new(format: OutputFormat, destination: Destination) -> Self {
        Self {
            format,
            destination,
        }
    }

    /// Builds a writer from the output configuration
    pub fn from_config(config: &OutputConfig) -> Self {
        let destination = match &config.path {
            Some(path) => Destination::File(path.clone()),
            None => Destination::Stdout,
        };
        Self::new(config.resolved_format(), destination)
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Encodes the records in this writer's format
    ///
    /// XML with no records encodes to nothing; JSON always yields an array.
    pub fn encode(&self, records: &[PageRecord]) -> OutputResult<Vec<u8>> {
        match self.format {
            OutputFormat::Xml => Ok(format_records_xml(records).into_bytes()),
            OutputFormat::Json => format_records_json(records),
        }
    }
}

impl OutputHandler for RecordWriter {
    fn write_records(&mut self, records: &[PageRecord]) -> OutputResult<usize> {
        let encoded = self.encode(records)?;

        if encoded.is_empty() {
            tracing::info!("No results to output");
            return Ok(0);
        }

        match &self.destination {
            Destination::File(path) => {
                std::fs::write(path, &encoded)?;
                tracing::info!(
                    "Wrote {} page(s) to {} as {}",
                    records.len(),
                    path.display(),
                    self.format
                );
            }
            Destination::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&encoded)?;
                stdout.write_all(b"\n")?;
                stdout.flush()?;
            }
        }

        Ok(records.len())
    }
}
