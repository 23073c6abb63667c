//! Fuzz target for canonical column naming.
//!
//! Canonical names must be stable: normalizing a canonical name again
//! returns it unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use podium::schema::canonical_name;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let once = canonical_name(&input);
    assert_eq!(canonical_name(&once), once);
    assert!(once
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
});
