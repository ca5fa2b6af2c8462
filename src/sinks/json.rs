use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{RecordSink, SinkError};
use crate::models::ExtractedRecord;

/// Pretty-printed JSON array, written on `finish`.
#[derive(Debug)]
pub struct JsonSink {
    path: PathBuf,
    records: Vec<ExtractedRecord>,
}

impl JsonSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: Vec::new(),
        }
    }
}

impl RecordSink for JsonSink {
    fn append(&mut self, record: &ExtractedRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &self.records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::sample_record;

    #[test]
    fn test_json_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut sink = JsonSink::new(&path);
        sink.append(&sample_record("acme", "https://acme.test/a", "Résultats de l’étude"))
            .unwrap();
        sink.finish().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Résultats de l’étude"));
        assert!(raw.contains("\"date\": \"2023-05-17\""));
        assert!(raw.starts_with('['));
    }

    #[test]
    fn test_empty_sink_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        JsonSink::new(&path).finish().unwrap();
        let parsed: Vec<ExtractedRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(parsed.is_empty());
    }
}
