//! Podium CLI - tiered ETL for Olympics datasets.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "podium=debug" } else { "podium=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            json,
        } => commands::run::run(input, config, &cli.store, json),

        Commands::Runs { history, json } => commands::runs::run(&cli.store, history, json),

        Commands::Query { query, limit, json } => {
            commands::query::run(query, &cli.store, limit, json)
        }

        Commands::Schema { config } => commands::schema::run(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
