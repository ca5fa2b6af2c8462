//! Pipeline orchestration: frontier, fetch, extract, clean, dedup, emit.
//!
//! Each source moves through [`PipelineState`]s. A failure on one candidate
//! is recorded in the [`SourceSummary`] and never stops the source; only a
//! sink failure aborts the run.

mod reextract;
mod summary;

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub use summary::{CandidateOutcome, ReextractSummary, SkipReason, SourceSummary};

use crate::extract::{FieldExtractor, PartialRecord};
use crate::models::{ArticleCandidate, ExtractedRecord, RawPage, DEFAULT_MAX_ITERATIONS};
use crate::registry::SiteAdapter;
use crate::scrapers::{FetchError, Frontier, HttpClient, PageFetcher, Termination};
use crate::services::{ContentCleaner, Deduplicator};
use crate::sinks::{RecordSink, SinkError};
use crate::storage::AttachmentStore;

/// Where a source currently is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Enumerating,
    Fetching,
    Extracting,
    Cleaning,
    Deduplicating,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Enumerating => "enumerating",
            PipelineState::Fetching => "fetching",
            PipelineState::Extracting => "extracting",
            PipelineState::Cleaning => "cleaning",
            PipelineState::Deduplicating => "deduplicating",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Progress events for the CLI.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    SourceStarted {
        source_id: String,
        name: String,
    },
    /// The frontier finished; candidate processing starts.
    Enumerated {
        source_id: String,
        candidates: usize,
        pages: u32,
        termination: Termination,
    },
    CandidateFinished {
        source_id: String,
        url: String,
        outcome: CandidateOutcome,
    },
    SourceFinished {
        summary: SourceSummary,
    },
}

/// Per-source state tracker; transitions are logged at debug level.
struct SourceRun<'a> {
    source_id: &'a str,
    state: PipelineState,
}

impl<'a> SourceRun<'a> {
    fn new(source_id: &'a str) -> Self {
        Self {
            source_id,
            state: PipelineState::Idle,
        }
    }

    fn enter(&mut self, next: PipelineState) {
        if self.state != next {
            debug!(source = self.source_id, from = %self.state, to = %next, "state");
            self.state = next;
        }
    }
}

/// A cleaned record plus the attachment links found on its page.
pub(crate) struct Assembled {
    pub record: ExtractedRecord,
    pub attachment_urls: Vec<String>,
}

/// Turn an extracted page into a record. Only a missing title rejects it.
pub(crate) fn assemble(
    partial: PartialRecord,
    candidate: &ArticleCandidate,
    cleaner: &ContentCleaner,
    summary_chars: Option<usize>,
) -> Result<Assembled, SkipReason> {
    let title = partial.title.ok_or(SkipReason::MissingTitle)?;
    let body = partial
        .body
        .map(|raw| cleaner.clean(&raw))
        .filter(|b| !b.is_empty());
    let summary = summary_chars
        .zip(body.as_deref())
        .map(|(max, b)| ContentCleaner::summarize(b, max));

    Ok(Assembled {
        record: ExtractedRecord {
            source_id: candidate.source_id.clone(),
            url: candidate.canonical_url.clone(),
            title,
            date: partial.date,
            author: partial.author,
            body,
            summary,
            content_source: partial.content_source,
            attachments: Vec::new(),
        },
        attachment_urls: partial.attachment_urls,
    })
}

/// Drives sources through the pipeline against one fetcher session.
pub struct Orchestrator {
    extractor: FieldExtractor,
    dedup: Deduplicator,
    max_iterations: u32,
    fetch_timeout: Duration,
    summary_chars: Option<usize>,
    snapshots: Option<AttachmentStore>,
    downloads: Option<(AttachmentStore, HttpClient)>,
    events: Option<mpsc::Sender<PipelineEvent>>,
}

impl Orchestrator {
    pub fn new(dedup: Deduplicator) -> Self {
        Self {
            extractor: FieldExtractor::default(),
            dedup,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            fetch_timeout: Duration::from_secs(30),
            summary_chars: None,
            snapshots: None,
            downloads: None,
            events: None,
        }
    }

    pub fn with_extractor(mut self, extractor: FieldExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Iteration cap for sources that do not set their own.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_summary_chars(mut self, max: Option<usize>) -> Self {
        self.summary_chars = max;
        self
    }

    /// Save the HTML of every emitted article page.
    pub fn with_snapshots(mut self, store: AttachmentStore) -> Self {
        self.snapshots = Some(store);
        self
    }

    /// Download attachments for sources with an attachment rule.
    pub fn with_downloads(mut self, store: AttachmentStore, client: HttpClient) -> Self {
        self.downloads = Some((store, client));
        self
    }

    pub fn with_events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn dedup(&self) -> &Deduplicator {
        &self.dedup
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Run every adapter in order against the same fetcher and sink. Sources
    /// that fail to enumerate still produce a summary.
    pub async fn run<F, S>(
        &self,
        adapters: &[&SiteAdapter],
        fetcher: &mut F,
        sink: &mut S,
    ) -> Result<Vec<SourceSummary>, SinkError>
    where
        F: PageFetcher + ?Sized,
        S: RecordSink + ?Sized,
    {
        let mut summaries = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            summaries.push(self.run_source(adapter, fetcher, sink).await?);
        }
        sink.finish()?;
        Ok(summaries)
    }

    /// Enumerate one source and process its candidates in discovery order.
    pub async fn run_source<F, S>(
        &self,
        adapter: &SiteAdapter,
        fetcher: &mut F,
        sink: &mut S,
    ) -> Result<SourceSummary, SinkError>
    where
        F: PageFetcher + ?Sized,
        S: RecordSink + ?Sized,
    {
        let source_id = adapter.source_id.as_str();
        let mut run = SourceRun::new(source_id);
        let mut summary = SourceSummary::new(source_id);
        self.emit(PipelineEvent::SourceStarted {
            source_id: source_id.to_string(),
            name: adapter.display_name().to_string(),
        })
        .await;

        let cleaner = adapter.cleaner().unwrap_or_else(|e| {
            warn!(source = source_id, "Cleaner patterns rejected, body left uncleaned: {}", e);
            ContentCleaner::default()
        });

        run.enter(PipelineState::Enumerating);
        let target = adapter.target(self.max_iterations);
        let outcome = Frontier::enumerate(&target, fetcher).await;
        summary.discovered = outcome.candidates.len();
        summary.pages = outcome.pages;
        summary.termination = outcome.termination.clone();
        if outcome.termination.is_failure() {
            warn!(source = source_id, "Listing enumeration stopped early: {}", outcome.termination);
        }
        self.emit(PipelineEvent::Enumerated {
            source_id: source_id.to_string(),
            candidates: outcome.candidates.len(),
            pages: outcome.pages,
            termination: outcome.termination,
        })
        .await;

        for candidate in &outcome.candidates {
            let result = self
                .process_candidate(adapter, &cleaner, candidate, fetcher, &mut run)
                .await;
            let outcome = match result {
                Ok((record, written)) => {
                    summary.attachments += written;
                    sink.append(&record)?;
                    self.dedup.commit(&record);
                    info!(source = source_id, url = %record.url, "Emitted: {}", record.title);
                    CandidateOutcome::Emitted {
                        title: record.title,
                    }
                }
                Err(outcome) => outcome,
            };
            summary.record(&candidate.canonical_url, &outcome);
            self.emit(PipelineEvent::CandidateFinished {
                source_id: source_id.to_string(),
                url: candidate.canonical_url.clone(),
                outcome,
            })
            .await;
            run.enter(PipelineState::Idle);
        }

        run.enter(PipelineState::Done);
        info!(
            source = source_id,
            discovered = summary.discovered,
            emitted = summary.emitted,
            duplicates = summary.rejected_duplicates,
            skipped = summary.skipped.len(),
            "Source finished"
        );
        self.emit(PipelineEvent::SourceFinished {
            summary: summary.clone(),
        })
        .await;
        Ok(summary)
    }

    /// Fetch, extract, clean and dedup one candidate. Returns the record to
    /// emit with the number of attachment files written, or the outcome that
    /// replaced it.
    async fn process_candidate<F>(
        &self,
        adapter: &SiteAdapter,
        cleaner: &ContentCleaner,
        candidate: &ArticleCandidate,
        fetcher: &mut F,
        run: &mut SourceRun<'_>,
    ) -> Result<(ExtractedRecord, usize), CandidateOutcome>
    where
        F: PageFetcher + ?Sized,
    {
        let url = candidate.canonical_url.as_str();
        if self.dedup.has_url(url) {
            debug!(url, "Already emitted, not fetching");
            return Err(CandidateOutcome::Duplicate);
        }

        run.enter(PipelineState::Fetching);
        let page = self.fetch(fetcher, url).await.map_err(|e| {
            warn!(source = %candidate.source_id, url, "Fetch failed: {}", e);
            CandidateOutcome::Skipped(SkipReason::Fetch(e.to_string()))
        })?;

        run.enter(PipelineState::Extracting);
        let partial = self.extractor.extract(&page, candidate, adapter);
        debug!(url, winners = ?partial.winners, "Extracted");

        run.enter(PipelineState::Cleaning);
        let Assembled {
            mut record,
            attachment_urls,
        } = assemble(partial, candidate, cleaner, self.summary_chars).map_err(|reason| {
            warn!(source = %candidate.source_id, url, "Skipped: {}", reason);
            CandidateOutcome::Skipped(reason)
        })?;

        run.enter(PipelineState::Deduplicating);
        if self.dedup.is_duplicate(&record) {
            debug!(url, title = %record.title, "Duplicate");
            return Err(CandidateOutcome::Duplicate);
        }

        if let Some(store) = &self.snapshots {
            if let Err(e) = store.write_snapshot(&record.source_id, &record.title, url, &page.html) {
                warn!(url, "Failed to save snapshot: {}", e);
            }
        }

        let mut written = 0;
        if let Some((store, client)) = &self.downloads {
            if adapter.attachments.is_some() && !attachment_urls.is_empty() {
                record.attachments =
                    download_attachments(store, client, &record, attachment_urls).await;
                written = record.attachments.len();
            }
        }
        Ok((record, written))
    }

    async fn fetch<F>(&self, fetcher: &mut F, url: &str) -> Result<RawPage, FetchError>
    where
        F: PageFetcher + ?Sized,
    {
        match tokio::time::timeout(self.fetch_timeout, fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                secs: self.fetch_timeout.as_secs(),
            }),
        }
    }
}

/// Download a record's attachments concurrently. Returns the paths written,
/// relative to the store root, in link order.
async fn download_attachments(
    store: &AttachmentStore,
    client: &HttpClient,
    record: &ExtractedRecord,
    urls: Vec<String>,
) -> Vec<String> {
    let mut set = JoinSet::new();
    for (index, url) in urls.into_iter().enumerate() {
        let client = client.clone();
        set.spawn(async move {
            let result = client.get_bytes(&url).await;
            (index, url, result)
        });
    }

    let mut written = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, _, Ok(bytes))) => {
                match store.write_attachment(&record.source_id, &record.title, index, &bytes) {
                    Ok(relpath) => written.push((index, relpath.to_string_lossy().into_owned())),
                    Err(e) => warn!("Failed to store attachment for {}: {}", record.url, e),
                }
            }
            Ok((_, url, Err(e))) => warn!("Attachment download failed for {}: {}", url, e),
            Err(e) => warn!("Attachment task failed: {}", e),
        }
    }
    written.sort_by_key(|(index, _)| *index);
    written.into_iter().map(|(_, path)| path).collect()
}
