//! Runs command - list runs and their state history.

use std::path::Path;

use chrono::{DateTime, Local, TimeDelta, Utc};
use colored::{ColoredString, Colorize};
use podium::{RunId, RunState, TieredStore};

fn colored_state(state: RunState) -> ColoredString {
    match state {
        RunState::Confirmed => state.as_str().green(),
        RunState::Failed => state.as_str().red(),
        _ => state.as_str().yellow(),
    }
}

/// Ledger timestamps are UTC; show them in the local zone.
fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn format_elapsed(elapsed: TimeDelta) -> String {
    if elapsed < TimeDelta::minutes(1) {
        format!("{:.3}s", elapsed.num_milliseconds() as f64 / 1000.0)
    } else {
        format!("{}m{:02}s", elapsed.num_minutes(), elapsed.num_seconds() % 60)
    }
}

pub fn run(
    store: &Path,
    history: Option<String>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = store;
    let store = TieredStore::local(root)?;

    if let Some(run_id) = history {
        let run_id: RunId = run_id.parse()?;
        let events = store.run_history(&run_id)?;
        if json_output {
            println!("{}", serde_json::to_string_pretty(&events)?);
            return Ok(());
        }
        println!("{} {}", "History of".cyan().bold(), run_id.to_string().white());
        for event in &events {
            println!(
                "  {:>3}  {}  {}",
                event.seq,
                local_time(event.at),
                colored_state(event.state)
            );
            if let Some(failure) = &event.failure {
                println!("       {} {}", failure.kind.to_string().red(), failure.message);
            }
        }
        return Ok(());
    }

    let runs = store.runs()?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No runs in {}", root.display());
        return Ok(());
    }

    println!("{}", "Runs:".cyan().bold());
    for record in &runs {
        println!(
            "  {}  {}  {:>9}  {}",
            record.run_id,
            local_time(record.started_at),
            format_elapsed(record.updated_at - record.started_at),
            colored_state(record.state)
        );
        if let Some(failure) = &record.failure {
            println!("      during {}: {}", failure.stage, failure.message.red());
        }
    }

    Ok(())
}
