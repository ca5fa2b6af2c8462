//! Cross-source duplicate suppression.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::ExtractedRecord;
use crate::storage::StorageError;

/// Lowercased, trimmed, whitespace-collapsed title used as a dedup key.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical URLs and normalized titles that have already been emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenIndex {
    #[serde(default)]
    pub urls: BTreeSet<String>,
    #[serde(default)]
    pub titles: BTreeSet<String>,
}

impl SeenIndex {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.titles.is_empty()
    }
}

/// First-write-wins record filter. Clones share one index.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    index: Arc<Mutex<SeenIndex>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: SeenIndex) -> Self {
        Self {
            index: Arc::new(Mutex::new(index)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SeenIndex> {
        self.index.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load a persisted index. A missing file is an empty index.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            debug!("No seen-index at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let index: SeenIndex = serde_json::from_str(&raw)?;
        info!(
            "Loaded seen-index from {} ({} urls)",
            path.display(),
            index.urls.len()
        );
        Ok(Self::from_index(index))
    }

    /// Persist the index, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&*self.lock())?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Whether a canonical URL was already emitted.
    pub fn has_url(&self, url: &str) -> bool {
        self.lock().urls.contains(url)
    }

    /// Whether the record's URL or normalized title was already emitted.
    pub fn is_duplicate(&self, record: &ExtractedRecord) -> bool {
        let index = self.lock();
        index.urls.contains(&record.url) || index.titles.contains(&normalize_title(&record.title))
    }

    /// Record an emitted record. Call once the record has been written.
    pub fn commit(&self, record: &ExtractedRecord) {
        let mut index = self.lock();
        index.urls.insert(record.url.clone());
        index.titles.insert(normalize_title(&record.title));
    }

    /// Check and commit in one step: accept a record unless its URL or
    /// normalized title was seen.
    pub fn accept(&self, record: &ExtractedRecord) -> bool {
        let title = normalize_title(&record.title);
        let mut index = self.lock();
        if index.urls.contains(&record.url) || index.titles.contains(&title) {
            return false;
        }
        index.urls.insert(record.url.clone());
        index.titles.insert(title);
        true
    }

    pub fn snapshot(&self) -> SeenIndex {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentSource;

    fn record(url: &str, title: &str) -> ExtractedRecord {
        ExtractedRecord {
            source_id: "acme".to_string(),
            url: url.to_string(),
            title: title.to_string(),
            date: None,
            author: None,
            body: None,
            summary: None,
            content_source: ContentSource::Markup,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Phase 2\n  RESULTS "), "phase 2 results");
    }

    #[test]
    fn test_rejects_same_url_with_different_title() {
        let dedup = Deduplicator::new();
        assert!(dedup.accept(&record("https://a.test/1", "Phase 2 Results")));
        assert!(!dedup.accept(&record("https://a.test/1", "PHASE 2   results announced")));
        assert!(dedup.has_url("https://a.test/1"));
    }

    #[test]
    fn test_rejects_same_title_at_different_url() {
        let dedup = Deduplicator::new();
        assert!(dedup.accept(&record("https://a.test/1", "Phase 2 Results")));
        assert!(!dedup.accept(&record("https://b.test/x", "  phase 2   RESULTS ")));
        assert!(dedup.accept(&record("https://b.test/y", "Phase 3 Results")));
    }

    #[test]
    fn test_check_leaves_index_until_commit() {
        let dedup = Deduplicator::new();
        let first = record("https://a.test/1", "One");
        assert!(!dedup.is_duplicate(&first));
        assert!(!dedup.has_url("https://a.test/1"));

        dedup.commit(&first);
        assert!(dedup.is_duplicate(&first));
        assert!(dedup.is_duplicate(&record("https://b.test/2", " ONE ")));
    }

    #[test]
    fn test_clones_share_index() {
        let dedup = Deduplicator::new();
        let other = dedup.clone();
        assert!(dedup.accept(&record("https://a.test/1", "One")));
        assert!(!other.accept(&record("https://a.test/1", "One")));
        assert_eq!(other.snapshot().len(), 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("seen.json");

        let dedup = Deduplicator::load(&path).unwrap();
        assert!(dedup.snapshot().is_empty());
        assert!(dedup.accept(&record("https://a.test/1", "One")));
        dedup.save(&path).unwrap();

        let reloaded = Deduplicator::load(&path).unwrap();
        assert!(!reloaded.accept(&record("https://a.test/1", "Another title")));
        assert!(!reloaded.accept(&record("https://a.test/2", "one")));
    }
}
