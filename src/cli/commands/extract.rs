//! `extract`: re-run extraction over saved snapshots.

use std::path::Path;

use console::style;

use crate::config::Config;
use crate::pipeline::Orchestrator;
use crate::services::Deduplicator;
use crate::sinks::ExportSet;
use crate::storage::AttachmentStore;

pub async fn cmd_extract(config: &Config, dir: &Path) -> anyhow::Result<()> {
    let registry = config.registry()?;
    let paths = AttachmentStore::list_snapshots(dir)?;
    if paths.is_empty() {
        println!("{} No snapshots found in {}", style("!").yellow(), dir.display());
        return Ok(());
    }

    let settings = &config.pipeline;
    println!(
        "{} Re-extracting {} snapshots with {} workers",
        style("→").cyan(),
        paths.len(),
        settings.extraction_workers
    );

    // Snapshots are records that were already emitted once, so the persisted
    // seen-index does not apply here.
    let orchestrator =
        Orchestrator::new(Deduplicator::new()).with_summary_chars(settings.summary_chars);
    let mut sink = ExportSet::new(&settings.output_dir, settings.format, settings.combined)?;
    let summary = orchestrator
        .reextract(&registry, paths, settings.extraction_workers, &mut sink)
        .await?;

    println!(
        "{} Emitted {} records ({} duplicates, {} skipped)",
        style("✓").green(),
        summary.emitted,
        summary.rejected_duplicates,
        summary.skipped.len()
    );
    for (path, reason) in &summary.skipped {
        println!("  {} {}: {}", style("✗").red(), path, reason);
    }
    Ok(())
}
