//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Podium: tiered ETL for Olympics datasets
#[derive(Parser)]
#[command(name = "podium")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Store directory
    #[arg(short, long, global = true, default_value = "store")]
    pub store: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest, clean and transform every configured dataset in one run
    Run {
        /// Directory holding the source files
        #[arg(value_name = "INPUT_DIR", default_value = "data")]
        input: PathBuf,

        /// Pipeline configuration (default: built-in Olympics pipeline)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List runs and their states
    Runs {
        /// Show the full event history of one run
        #[arg(long, value_name = "RUN_ID")]
        history: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query the latest confirmed run
    Query {
        #[command(subcommand)]
        query: QueryCommand,

        /// Maximum rows to print
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long, global = true)]
        json: bool,
    },

    /// Print the pipeline configuration as JSON
    Schema {
        /// Configuration file to validate and print (default: built-in)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum QueryCommand {
    /// List confirmed datasets
    Datasets,

    /// Show a confirmed dataset
    Show {
        /// Dataset name
        name: String,
    },

    /// Medal totals per country
    Medals,

    /// Athlete counts per discipline
    Participants,

    /// Entries per discipline and gender
    Entries,

    /// Rows with the largest values in a column
    Top {
        /// Dataset name
        name: String,

        /// Column to rank by
        column: String,

        /// Number of rows
        #[arg(short, default_value = "10")]
        n: usize,
    },

    /// Row counts grouped by columns
    Count {
        /// Dataset name
        name: String,

        /// Columns to group by
        #[arg(required = true)]
        group_by: Vec<String>,
    },
}
