//! `scrape`: crawl sources and export records.

use console::style;
use tokio::sync::mpsc;

use crate::cli::progress::RunProgress;
use crate::config::{Config, FetcherKind};
use crate::models::PaginationStrategy;
use crate::pipeline::{Orchestrator, PipelineEvent};
use crate::scrapers::{BrowserFetcher, HttpClient, HttpFetcher, PageFetcher};
use crate::services::Deduplicator;
use crate::sinks::ExportSet;
use crate::storage::AttachmentStore;

pub struct ScrapeOptions {
    pub sources: Vec<String>,
    pub all: bool,
    /// Start with an empty seen-index.
    pub fresh: bool,
    pub verbose: bool,
}

pub async fn cmd_scrape(config: &Config, options: ScrapeOptions) -> anyhow::Result<()> {
    if options.sources.is_empty() && !options.all {
        println!(
            "{} Name one or more sources, or pass --all. Run 'news sources' to list them.",
            style("!").yellow()
        );
        return Ok(());
    }

    let registry = config.registry()?;
    let adapters = registry.select(&options.sources)?;
    let settings = &config.pipeline;

    if settings.fetcher == FetcherKind::Http {
        for adapter in &adapters {
            if matches!(
                adapter.pagination,
                PaginationStrategy::LoadMore { .. } | PaginationStrategy::Scroll
            ) {
                println!(
                    "{} {} uses {} pagination; the HTTP fetcher only sees the first listing state",
                    style("!").yellow(),
                    adapter.source_id,
                    adapter.pagination.as_str()
                );
            }
        }
    }

    let state_file = settings.state_file();
    let dedup = if options.fresh {
        Deduplicator::new()
    } else {
        Deduplicator::load(&state_file)?
    };

    let client = HttpClient::new(settings.fetch_timeout(), settings.user_agent.as_deref())?;
    let mut fetcher: Box<dyn PageFetcher> = match settings.fetcher {
        FetcherKind::Browser => Box::new(BrowserFetcher::new(config.browser.clone())),
        FetcherKind::Http => Box::new(HttpFetcher::new(client.clone())),
    };

    let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(100);
    let mut orchestrator = Orchestrator::new(dedup.clone())
        .with_max_iterations(settings.max_iterations)
        .with_fetch_timeout(settings.fetch_timeout())
        .with_summary_chars(settings.summary_chars)
        .with_events(event_tx);
    if settings.snapshots {
        orchestrator = orchestrator.with_snapshots(AttachmentStore::new(settings.snapshot_dir()));
    }
    if settings.attachments {
        orchestrator =
            orchestrator.with_downloads(AttachmentStore::new(settings.attachment_dir()), client);
    }

    println!(
        "{} Scraping {} source(s) into {}",
        style("→").cyan(),
        adapters.len(),
        settings.output_dir.display()
    );

    let verbose = options.verbose;
    let event_handler = tokio::spawn(async move {
        let mut progress = RunProgress::new(verbose);
        while let Some(event) = event_rx.recv().await {
            progress.handle(event);
        }
        progress.finish();
    });

    let mut sink = ExportSet::new(&settings.output_dir, settings.format, settings.combined)?;
    let result = orchestrator.run(&adapters, fetcher.as_mut(), &mut sink).await;
    fetcher.close().await;
    drop(orchestrator);

    if let Err(e) = event_handler.await {
        tracing::warn!("Event handler task failed: {}", e);
    }

    // Buffered exports are lost when a write fails, so the index stays as loaded.
    let summaries = match result {
        Ok(summaries) => summaries,
        Err(e) => {
            println!(
                "{} Export failed, seen-index left unchanged at {}",
                style("✗").red(),
                state_file.display()
            );
            return Err(e.into());
        }
    };
    dedup.save(&state_file)?;

    let emitted: usize = summaries.iter().map(|s| s.emitted).sum();
    let failed: Vec<_> = summaries
        .iter()
        .filter(|s| s.termination.is_failure())
        .collect();

    println!(
        "{} Emitted {} new records from {} source(s)",
        style("✓").green(),
        emitted,
        summaries.len()
    );
    for summary in failed {
        println!(
            "  {} {} stopped early: {}",
            style("!").yellow(),
            summary.source_id,
            summary.termination
        );
    }
    println!(
        "  {} Seen-index saved to {}",
        style("→").dim(),
        state_file.display()
    );

    Ok(())
}
