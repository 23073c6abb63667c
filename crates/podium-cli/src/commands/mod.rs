//! CLI command implementations.

pub mod query;
pub mod run;
pub mod runs;
pub mod schema;

use std::path::PathBuf;

use colored::Colorize;
use podium::{Dataset, PipelineConfig};

/// The configuration file if given, otherwise the built-in pipeline.
pub fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(PipelineConfig::load(&path)?),
        None => Ok(PipelineConfig::olympics()),
    }
}

/// Render up to `limit` rows as an aligned text table.
pub fn render_table(dataset: &Dataset, limit: usize) -> String {
    let headers = dataset.schema.column_names();
    let cells: Vec<Vec<String>> = dataset
        .rows
        .iter()
        .take(limit)
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = vec![line(headers), line(rule.iter().map(String::as_str).collect())];
    for row in &cells {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

/// Print a dataset with a header line.
pub fn print_dataset(dataset: &Dataset, limit: usize) {
    println!(
        "{} {} ({} rows)",
        "Dataset".cyan().bold(),
        dataset.name.white().bold(),
        dataset.row_count()
    );
    println!();
    println!("{}", render_table(dataset, limit));
    if dataset.row_count() > limit {
        println!("{}", format!("... {} more rows", dataset.row_count() - limit).dimmed());
    }
}
