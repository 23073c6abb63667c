//! Schema command - validate and print a pipeline configuration.

use std::path::PathBuf;

use super::load_config;

pub fn run(config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    config.validate()?;
    println!("{}", config.to_json()?);
    Ok(())
}
