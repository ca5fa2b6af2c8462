//! Per-source run accounting.

use std::fmt;

use serde::Serialize;

use crate::scrapers::Termination;

/// Why a candidate produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The article page could not be fetched.
    Fetch(String),
    /// No strategy in the title chain produced a value.
    MissingTitle,
    /// A saved snapshot could not be read.
    Snapshot(String),
    /// A saved snapshot belongs to a source that is not registered.
    UnknownSource(String),
    /// The extraction worker panicked or was cancelled.
    Worker(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Fetch(e) => write!(f, "fetch failed: {}", e),
            SkipReason::MissingTitle => write!(f, "no title"),
            SkipReason::Snapshot(e) => write!(f, "unreadable snapshot: {}", e),
            SkipReason::UnknownSource(id) => write!(f, "unknown source '{}'", id),
            SkipReason::Worker(e) => write!(f, "worker failed: {}", e),
        }
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Emitted { title: String },
    /// URL or title was already emitted, in this run or an earlier one.
    Duplicate,
    Skipped(SkipReason),
}

/// Result of running one source through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source_id: String,
    /// Unique relevant candidates the frontier produced.
    pub discovered: usize,
    /// Listing states the frontier loaded.
    pub pages: u32,
    pub emitted: usize,
    pub rejected_duplicates: usize,
    /// Skipped candidates with the reason, by URL.
    pub skipped: Vec<(String, SkipReason)>,
    #[serde(serialize_with = "display")]
    pub termination: Termination,
    /// Attachment files written.
    pub attachments: usize,
}

fn display<S: serde::Serializer>(value: &Termination, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

impl SourceSummary {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            discovered: 0,
            pages: 0,
            emitted: 0,
            rejected_duplicates: 0,
            skipped: Vec::new(),
            termination: Termination::Exhausted,
            attachments: 0,
        }
    }

    pub fn record(&mut self, url: &str, outcome: &CandidateOutcome) {
        match outcome {
            CandidateOutcome::Emitted { .. } => self.emitted += 1,
            CandidateOutcome::Duplicate => self.rejected_duplicates += 1,
            CandidateOutcome::Skipped(reason) => {
                self.skipped.push((url.to_string(), reason.clone()))
            }
        }
    }

    /// Every discovered candidate has an outcome.
    pub fn is_complete(&self) -> bool {
        self.emitted + self.rejected_duplicates + self.skipped.len() == self.discovered
    }
}

/// Result of re-extracting a directory of snapshots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReextractSummary {
    pub processed: usize,
    pub emitted: usize,
    pub rejected_duplicates: usize,
    /// Skipped snapshots with the reason, by file path.
    pub skipped: Vec<(String, SkipReason)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let mut summary = SourceSummary::new("acme");
        summary.discovered = 3;
        summary.record("https://a", &CandidateOutcome::Emitted { title: "A".into() });
        summary.record("https://b", &CandidateOutcome::Duplicate);
        assert!(!summary.is_complete());
        summary.record("https://c", &CandidateOutcome::Skipped(SkipReason::MissingTitle));

        assert!(summary.is_complete());
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.rejected_duplicates, 1);
        assert_eq!(summary.skipped, vec![("https://c".to_string(), SkipReason::MissingTitle)]);
    }

    #[test]
    fn test_summary_serializes_termination_text() {
        let mut summary = SourceSummary::new("acme");
        summary.termination = Termination::IterationCap;
        summary.skipped.push(("u".into(), SkipReason::Fetch("timeout".into())));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["termination"], "iteration cap reached");
        assert_eq!(json["skipped"][0][1]["reason"], "fetch");
        assert_eq!(json["skipped"][0][1]["detail"], "timeout");
    }
}
