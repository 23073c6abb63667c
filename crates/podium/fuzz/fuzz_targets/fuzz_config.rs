//! Fuzz target for pipeline configuration parsing.
//!
//! Arbitrary JSON must be rejected with an error, never a panic, and any
//! accepted configuration must survive a JSON round trip.

#![no_main]

use libfuzzer_sys::fuzz_target;
use podium::PipelineConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = PipelineConfig::from_json(text) {
        let json = config.to_json().expect("accepted config serializes");
        let back = PipelineConfig::from_json(&json).expect("serialized config parses");
        assert_eq!(back.datasets, config.datasets);
    }
});
