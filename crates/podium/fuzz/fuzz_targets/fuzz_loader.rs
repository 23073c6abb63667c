//! Fuzz target for typed coercion of parsed rows.
//!
//! Every row either coerces into the medals schema or is reported as a
//! row error; nothing panics and the two counts always add up.

#![no_main]

use libfuzzer_sys::fuzz_target;
use podium::input::{Loader, LoaderConfig, Parser, SourceMetadata};
use podium::PipelineConfig;

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let registry = match PipelineConfig::olympics().registry() {
        Ok(registry) => registry,
        Err(_) => return,
    };
    let config = LoaderConfig {
        max_row_errors: usize::MAX,
        ..LoaderConfig::default()
    };
    let Ok(loader) = Loader::new(&registry, &config) else {
        return;
    };

    let input = format!("Rank,TeamCountry,Gold,Silver,Bronze,Total,Rank by Total\n{}", text);
    let Ok(table) = Parser::new().parse_bytes(input.as_bytes(), b',') else {
        return;
    };
    let source = SourceMetadata::new(
        "Medals.csv".into(),
        String::new(),
        input.len() as u64,
        "csv".to_string(),
        table.row_count(),
        table.column_count(),
    );
    if let Ok(outcome) = loader.coerce("medals", &table, source) {
        assert!(outcome.dataset.row_count() <= table.row_count());
        assert!(outcome.dataset.validate().is_ok());
    }
});
