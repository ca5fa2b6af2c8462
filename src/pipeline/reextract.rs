//! Re-run extraction over saved article snapshots.
//!
//! Documents are parsed on blocking worker threads; results come back in
//! input order so dedup keeps first-write-wins semantics.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::{assemble, Assembled, Orchestrator, ReextractSummary, SkipReason};
use crate::extract::FieldExtractor;
use crate::models::{ArticleCandidate, ExtractedRecord, RawPage};
use crate::registry::{SiteAdapter, SiteRegistry};
use crate::services::ContentCleaner;
use crate::sinks::{RecordSink, SinkError};
use crate::storage::AttachmentStore;

struct SourceKit {
    adapter: SiteAdapter,
    cleaner: ContentCleaner,
}

impl Orchestrator {
    /// Extract records from snapshot files with `workers` parallel parsers,
    /// then dedup and emit them in file order.
    pub async fn reextract<S>(
        &self,
        registry: &SiteRegistry,
        paths: Vec<PathBuf>,
        workers: usize,
        sink: &mut S,
    ) -> Result<ReextractSummary, SinkError>
    where
        S: RecordSink + ?Sized,
    {
        let kits: Arc<HashMap<String, SourceKit>> = Arc::new(
            registry
                .iter()
                .filter_map(|adapter| match adapter.cleaner() {
                    Ok(cleaner) => Some((
                        adapter.source_id.clone(),
                        SourceKit {
                            adapter: adapter.clone(),
                            cleaner,
                        },
                    )),
                    Err(e) => {
                        warn!(source = %adapter.source_id, "Skipping source: {}", e);
                        None
                    }
                })
                .collect(),
        );

        let mut results = stream::iter(paths)
            .map(|path| {
                let kits = kits.clone();
                let extractor = self.extractor.clone();
                let summary_chars = self.summary_chars;
                let label = path.display().to_string();
                let handle = tokio::task::spawn_blocking(move || {
                    extract_snapshot(&path, &kits, &extractor, summary_chars)
                });
                async move {
                    let result = handle
                        .await
                        .unwrap_or_else(|e| Err(SkipReason::Worker(e.to_string())));
                    (label, result)
                }
            })
            .buffered(workers.max(1));

        let mut summary = ReextractSummary::default();
        while let Some((label, result)) = results.next().await {
            summary.processed += 1;
            match result {
                Ok(record) => {
                    if !self.dedup.is_duplicate(&record) {
                        sink.append(&record)?;
                        self.dedup.commit(&record);
                        summary.emitted += 1;
                    } else {
                        debug!(url = %record.url, "Duplicate");
                        summary.rejected_duplicates += 1;
                    }
                }
                Err(reason) => {
                    warn!("Skipped {}: {}", label, reason);
                    summary.skipped.push((label, reason));
                }
            }
        }
        sink.finish()?;

        info!(
            processed = summary.processed,
            emitted = summary.emitted,
            duplicates = summary.rejected_duplicates,
            "Re-extraction finished"
        );
        Ok(summary)
    }
}

fn extract_snapshot(
    path: &Path,
    kits: &HashMap<String, SourceKit>,
    extractor: &FieldExtractor,
    summary_chars: Option<usize>,
) -> Result<ExtractedRecord, SkipReason> {
    let snapshot =
        AttachmentStore::read_snapshot(path).map_err(|e| SkipReason::Snapshot(e.to_string()))?;
    let kit = kits
        .get(&snapshot.source_id)
        .ok_or_else(|| SkipReason::UnknownSource(snapshot.source_id.clone()))?;

    let candidate = ArticleCandidate {
        source_id: snapshot.source_id,
        canonical_url: snapshot.url.clone(),
        anchor_text: String::new(),
    };
    let page = RawPage::new(snapshot.url, snapshot.html);
    let partial = extractor.extract(&page, &candidate, &kit.adapter);
    let Assembled { record, .. } = assemble(partial, &candidate, &kit.cleaner, summary_chars)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Deduplicator;
    use crate::sinks::MemorySink;

    fn registry() -> SiteRegistry {
        let mut sources = std::collections::BTreeMap::new();
        sources.insert(
            "acme".to_string(),
            SiteAdapter::new("acme", "https://acme.test/news"),
        );
        SiteRegistry::default().with_overrides(sources)
    }

    fn page(title: &str) -> String {
        format!(
            "<html><head><script type=\"application/ld+json\">\
             {{\"@type\": \"NewsArticle\", \"headline\": \"{title}\", \"datePublished\": \"2020-01-15\"}}\
             </script></head><body><article><p>Body of {title}.</p></article></body></html>"
        )
    }

    #[tokio::test]
    async fn test_reextract_in_order_with_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path());
        store
            .write_snapshot("acme", "a", "https://acme.test/a", &page("Alzheimer study"))
            .unwrap();
        store
            .write_snapshot("acme", "b", "https://acme.test/b", &page("Alzheimer  STUDY"))
            .unwrap();
        store
            .write_snapshot("acme", "c", "https://acme.test/c", &page("Second study"))
            .unwrap();
        store
            .write_snapshot("other", "d", "https://other.test/d", &page("Elsewhere"))
            .unwrap();
        std::fs::write(dir.path().join("acme").join("e.html"), "<html></html>").unwrap();

        let paths = AttachmentStore::list_snapshots(dir.path()).unwrap();
        assert_eq!(paths.len(), 5);

        let orchestrator = Orchestrator::new(Deduplicator::new());
        let mut sink = MemorySink::new();
        let summary = orchestrator
            .reextract(&registry(), paths, 3, &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.processed, 5);
        assert_eq!(summary.emitted, 2);
        assert_eq!(summary.rejected_duplicates, 1);
        assert_eq!(summary.skipped.len(), 2);
        assert!(sink.is_finished());

        let titles: Vec<&str> = sink.records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Alzheimer study", "Second study"]);
        let first = &sink.records()[0];
        assert_eq!(first.url, "https://acme.test/a");
        assert_eq!(first.date.map(|d| d.to_string()).as_deref(), Some("2020-01-15"));
        assert_eq!(first.body.as_deref(), Some("Body of Alzheimer study."));
    }
}
