//! Run command - execute one pipeline run.

use std::path::{Path, PathBuf};

use colored::Colorize;
use podium::{Pipeline, TieredStore};
use tracing::debug;

use super::load_config;

pub fn run(
    input: PathBuf,
    config: Option<PathBuf>,
    store: &Path,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.is_dir() {
        return Err(format!("Input directory not found: {}", input.display()).into());
    }

    let config = load_config(config)?;
    let store = TieredStore::local(store)?;
    debug!(datasets = config.datasets.len(), derivations = config.derivations.len(), "Loaded configuration");

    let pipeline = Pipeline::new(config, store)?;
    let summary = pipeline.run(&input)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} {}", "Run".cyan().bold(), summary.run_id.to_string().white().bold());
    println!();

    println!("{}", "Ingested:".yellow().bold());
    for load in &summary.loads {
        let rejected = if load.row_errors.is_empty() {
            String::new()
        } else {
            format!(" ({} rejected)", load.row_errors.len()).red().to_string()
        };
        println!(
            "  {:<16} {:>6} rows from {}{}",
            load.dataset,
            load.rows,
            load.source.file.dimmed(),
            rejected
        );
    }
    println!();

    println!("{}", "Cleaned:".yellow().bold());
    for report in &summary.cleaning {
        println!(
            "  {:<16} {:>6} -> {:<6} duplicates: {}  filled: {}  dropped: {}",
            report.dataset,
            report.rows_in,
            report.rows_out,
            report.duplicates_removed,
            report.rows_filled,
            report.rows_dropped
        );
    }
    println!();

    println!("{}", "Confirmed:".green().bold());
    for (name, rows) in &summary.confirmed {
        println!("  {:<28} {:>6} rows", name, rows);
    }

    Ok(())
}
