//! Record sinks: where emitted records go.

mod csv;
mod json;
mod memory;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

pub use self::csv::CsvSink;
pub use self::json::JsonSink;
pub use self::memory::MemorySink;

use crate::config::OutputFormat;
use crate::models::ExtractedRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Consumer of emitted records. Records arrive in emission order; `finish`
/// flushes whatever the sink buffers.
pub trait RecordSink: Send {
    fn append(&mut self, record: &ExtractedRecord) -> Result<(), SinkError>;

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn append(&mut self, record: &ExtractedRecord) -> Result<(), SinkError> {
        (**self).append(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Open a file sink of the given format.
pub fn open_sink(path: &Path, format: OutputFormat) -> Result<Box<dyn RecordSink>, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(match format {
        OutputFormat::Json => Box::new(JsonSink::new(path)),
        OutputFormat::Csv => Box::new(CsvSink::create(path)?),
    })
}

/// Per-source export files plus an optional combined file.
///
/// Files are `<dir>/<source_id>.<ext>` and `<dir>/combined.<ext>`. A source
/// file is only created once that source emits its first record.
pub struct ExportSet {
    dir: PathBuf,
    format: OutputFormat,
    per_source: BTreeMap<String, Box<dyn RecordSink>>,
    combined: Option<Box<dyn RecordSink>>,
}

impl ExportSet {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat, combined: bool) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let combined = if combined {
            Some(open_sink(
                &dir.join(format!("combined.{}", format.extension())),
                format,
            )?)
        } else {
            None
        };
        Ok(Self {
            dir,
            format,
            per_source: BTreeMap::new(),
            combined,
        })
    }

    pub fn source_path(&self, source_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", source_id, self.format.extension()))
    }
}

impl RecordSink for ExportSet {
    fn append(&mut self, record: &ExtractedRecord) -> Result<(), SinkError> {
        if !self.per_source.contains_key(&record.source_id) {
            let sink = open_sink(&self.source_path(&record.source_id), self.format)?;
            self.per_source.insert(record.source_id.clone(), sink);
        }
        if let Some(sink) = self.per_source.get_mut(&record.source_id) {
            sink.append(record)?;
        }
        if let Some(combined) = self.combined.as_mut() {
            combined.append(record)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        for (source_id, sink) in self.per_source.iter_mut() {
            sink.finish()?;
            info!(
                "Wrote {}",
                self.dir
                    .join(format!("{}.{}", source_id, self.format.extension()))
                    .display()
            );
        }
        if let Some(combined) = self.combined.as_mut() {
            combined.finish()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_record(source_id: &str, url: &str, title: &str) -> ExtractedRecord {
    use crate::models::ContentSource;

    ExtractedRecord {
        source_id: source_id.to_string(),
        url: url.to_string(),
        title: title.to_string(),
        date: chrono::NaiveDate::from_ymd_opt(2023, 5, 17),
        author: Some("Acme".to_string()),
        body: Some("First paragraph.\nSecond paragraph.".to_string()),
        summary: None,
        content_source: ContentSource::Markup,
        attachments: Vec::new(),
    }
}
