//! Query command - read the latest confirmed run.

use std::path::Path;

use colored::Colorize;
use podium::{QueryEngine, TieredStore};

use super::print_dataset;
use crate::cli::QueryCommand;

pub fn run(
    query: QueryCommand,
    store: &Path,
    limit: usize,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = QueryEngine::new(TieredStore::local(store)?);

    let dataset = match query {
        QueryCommand::Datasets => {
            let run = engine.latest_run()?;
            let names = engine.datasets()?;
            if json_output {
                let listing = serde_json::json!({ "run_id": run, "datasets": names });
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                println!("{} {}", "Confirmed datasets in".cyan().bold(), run.to_string().white());
                for name in names {
                    println!("  {}", name);
                }
            }
            return Ok(());
        }
        QueryCommand::Show { name } => engine.dataset(&name)?,
        QueryCommand::Medals => engine.medal_counts_by_country()?,
        QueryCommand::Participants => engine.participants_by_discipline()?,
        QueryCommand::Entries => engine.entries_by_discipline_and_gender()?,
        QueryCommand::Top { name, column, n } => engine.top_n(&name, &column, n)?,
        QueryCommand::Count { name, group_by } => engine.group_count(&name, group_by.as_slice())?,
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&dataset)?);
    } else {
        print_dataset(&dataset, limit);
    }
    Ok(())
}
