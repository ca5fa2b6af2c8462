//! `sources`: list the registry.

use console::style;

use crate::cli::helpers::truncate;
use crate::config::Config;

pub fn cmd_sources(config: &Config) -> anyhow::Result<()> {
    let registry = config.registry()?;
    if registry.is_empty() {
        println!("{} No sources registered", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", style("News Sources").bold());
    println!("{}", "-".repeat(90));
    println!("{:<16} {:<22} {:<10} Start URL", "ID", "Name", "Paging");
    println!("{}", "-".repeat(90));

    for adapter in registry.iter() {
        println!(
            "{:<16} {:<22} {:<10} {}",
            adapter.source_id,
            truncate(adapter.display_name(), 21),
            adapter.pagination.as_str(),
            adapter.start_url
        );
    }

    if let Some(path) = &config.source_path {
        println!(
            "\n  {} Includes sources from {}",
            style("→").dim(),
            path.display()
        );
    }
    Ok(())
}
