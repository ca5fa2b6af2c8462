//! Progress display for pipeline runs.
//!
//! Also provides global progress context so log-style output printed during a
//! run does not tear the bars.

use std::sync::{OnceLock, RwLock};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::pipeline::{CandidateOutcome, PipelineEvent, SourceSummary};

/// Global reference to active progress display for coordinating output.
static ACTIVE_PROGRESS: OnceLock<RwLock<Option<MultiProgress>>> = OnceLock::new();

fn active_progress() -> &'static RwLock<Option<MultiProgress>> {
    ACTIVE_PROGRESS.get_or_init(|| RwLock::new(None))
}

pub fn set_active_progress(multi: Option<MultiProgress>) {
    if let Ok(mut guard) = active_progress().write() {
        *guard = multi;
    }
}

/// Print through the active progress display, or plain stdout when none is active.
pub fn progress_println(message: &str) {
    if let Ok(guard) = active_progress().read() {
        if let Some(ref multi) = *guard {
            let _ = multi.println(message);
            return;
        }
    }
    println!("{}", message);
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap()
        .progress_chars("█▓░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {wide_msg}")
        .unwrap()
}

/// Renders [`PipelineEvent`]s: a spinner while a source enumerates, then a
/// bar over its candidates.
pub struct RunProgress {
    multi: MultiProgress,
    bar: Option<ProgressBar>,
    verbose: bool,
}

impl RunProgress {
    pub fn new(verbose: bool) -> Self {
        let multi = MultiProgress::new();
        set_active_progress(Some(multi.clone()));
        Self {
            multi,
            bar: None,
            verbose,
        }
    }

    pub fn handle(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::SourceStarted { source_id, name } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar.enable_steady_tick(std::time::Duration::from_millis(120));
                bar.set_message(format!("{} ({}): enumerating listing", name, source_id));
                self.bar = Some(bar);
            }
            PipelineEvent::Enumerated {
                source_id,
                candidates,
                pages,
                termination,
            } => {
                if let Some(bar) = &self.bar {
                    bar.set_style(bar_style());
                    bar.set_length(candidates as u64);
                    bar.set_position(0);
                    bar.set_message(source_id.clone());
                }
                let line = format!(
                    "{} {}: {} candidates over {} listing pages ({})",
                    style("→").cyan(),
                    source_id,
                    candidates,
                    pages,
                    termination
                );
                if termination.is_failure() {
                    progress_println(&format!("{} {}", style("!").yellow(), line));
                } else {
                    progress_println(&line);
                }
            }
            PipelineEvent::CandidateFinished { url, outcome, .. } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                match outcome {
                    CandidateOutcome::Emitted { title } if self.verbose => {
                        progress_println(&format!("  {} {}", style("✓").green(), title));
                    }
                    CandidateOutcome::Skipped(reason) => {
                        progress_println(&format!("  {} {}: {}", style("✗").red(), url, reason));
                    }
                    _ => {}
                }
            }
            PipelineEvent::SourceFinished { summary } => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
                progress_println(&summary_line(&summary));
            }
        }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
        set_active_progress(None);
    }
}

/// One-line result for a source.
pub fn summary_line(summary: &SourceSummary) -> String {
    let marker = if summary.termination.is_failure() {
        style("!").yellow()
    } else {
        style("✓").green()
    };
    let mut line = format!(
        "{} {}: {} emitted, {} duplicates, {} skipped",
        marker,
        summary.source_id,
        summary.emitted,
        summary.rejected_duplicates,
        summary.skipped.len()
    );
    if summary.attachments > 0 {
        line.push_str(&format!(", {} attachments", summary.attachments));
    }
    line
}
