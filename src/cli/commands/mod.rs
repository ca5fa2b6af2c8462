//! CLI parser and command dispatch.

mod extract;
mod scrape;
mod sources;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, FetcherKind, OutputFormat};

#[derive(Parser)]
#[command(name = "news")]
#[command(about = "Press-release and news record acquisition")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./newsacquire.toml or ./newsacquire.json)
    #[arg(short, long, global = true, env = "NEWSACQUIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Output directory (overrides the config file)
    #[arg(short, long, global = true, env = "NEWSACQUIRE_OUTPUT")]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl sources and export their records
    Scrape {
        /// Source IDs to scrape
        sources: Vec<String>,
        /// Scrape every registered source
        #[arg(long, conflicts_with = "sources")]
        all: bool,
        /// Export format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
        /// Page fetcher to use
        #[arg(long, value_enum)]
        fetcher: Option<FetcherKind>,
        /// Save the HTML of every emitted article
        #[arg(long)]
        snapshots: bool,
        /// Download attachments (PDFs) linked from articles
        #[arg(long)]
        attachments: bool,
        /// Ignore the seen-index from earlier runs
        #[arg(long)]
        fresh: bool,
    },

    /// List registered sources
    Sources,

    /// Re-run extraction over saved article snapshots
    Extract {
        /// Snapshot directory (as written by `scrape --snapshots`)
        dir: PathBuf,
        /// Parallel extraction workers
        #[arg(short, long)]
        workers: Option<usize>,
        /// Export format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).await?;
    if let Some(output) = cli.output {
        config.pipeline.output_dir = output;
    }

    match cli.command {
        Commands::Scrape {
            sources,
            all,
            format,
            fetcher,
            snapshots,
            attachments,
            fresh,
        } => {
            let pipeline = &mut config.pipeline;
            if let Some(format) = format {
                pipeline.format = format;
            }
            if let Some(fetcher) = fetcher {
                pipeline.fetcher = fetcher;
            }
            pipeline.snapshots |= snapshots;
            pipeline.attachments |= attachments;

            let options = scrape::ScrapeOptions {
                sources,
                all,
                fresh,
                verbose: cli.verbose,
            };
            scrape::cmd_scrape(&config, options).await
        }
        Commands::Sources => sources::cmd_sources(&config),
        Commands::Extract {
            dir,
            workers,
            format,
        } => {
            if let Some(workers) = workers {
                config.pipeline.extraction_workers = workers;
            }
            if let Some(format) = format {
                config.pipeline.format = format;
            }
            extract::cmd_extract(&config, &dir).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scrape() {
        let cli = Cli::try_parse_from(["news", "scrape", "eisai", "annovis", "--fetcher", "http"])
            .unwrap();
        match cli.command {
            Commands::Scrape {
                sources, fetcher, ..
            } => {
                assert_eq!(sources, vec!["eisai", "annovis"]);
                assert_eq!(fetcher, Some(FetcherKind::Http));
            }
            _ => panic!("expected scrape"),
        }
        assert!(Cli::try_parse_from(["news", "scrape", "eisai", "--all"]).is_err());
    }
}
