//! Fuzz target for the delimited-text parser.
//!
//! The parser must never panic on malformed input, whichever delimiter
//! detection settles on, and must always produce rectangular headers.

#![no_main]

use libfuzzer_sys::fuzz_target;
use podium::input::Parser;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let parser = Parser::new();
    for delimiter in [b',', b'\t', b';', b'|'] {
        if let Ok(table) = parser.parse_bytes(data, delimiter) {
            assert_eq!(table.headers.len(), table.column_count());
        }
    }

    // Auto-detection goes through the file path
    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            let _ = parser.parse_file(temp_file.path());
        }
    }
});
