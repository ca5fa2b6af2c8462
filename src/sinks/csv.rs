use std::fs::File;
use std::path::Path;

use serde::Serialize;

use super::{RecordSink, SinkError};
use crate::models::ExtractedRecord;

/// Flat CSV row; attachments are joined with `;`.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    source_id: &'a str,
    url: &'a str,
    title: &'a str,
    date: Option<String>,
    author: Option<&'a str>,
    body: Option<&'a str>,
    summary: Option<&'a str>,
    content_source: &'static str,
    attachments: String,
}

impl<'a> From<&'a ExtractedRecord> for CsvRow<'a> {
    fn from(record: &'a ExtractedRecord) -> Self {
        Self {
            source_id: &record.source_id,
            url: &record.url,
            title: &record.title,
            date: record.date.map(|d| d.format("%Y-%m-%d").to_string()),
            author: record.author.as_deref(),
            body: record.body.as_deref(),
            summary: record.summary.as_deref(),
            content_source: record.content_source.as_str(),
            attachments: record.attachments.join(";"),
        }
    }
}

/// Streams rows to a CSV file with a header line.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &ExtractedRecord) -> Result<(), SinkError> {
        self.writer.serialize(CsvRow::from(record))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
