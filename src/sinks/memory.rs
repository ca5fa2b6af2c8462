use super::{RecordSink, SinkError};
use crate::models::ExtractedRecord;

/// Keeps records in memory; used by tests and library callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<ExtractedRecord>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ExtractedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExtractedRecord> {
        self.records
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &ExtractedRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}
