//! Canonical column naming.

use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

static ACRONYM_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Normalize a column name to lower snake_case.
///
/// `"Rank by Total"` becomes `rank_by_total`, `"TeamCountry"` becomes
/// `team_country`. Already-canonical names are returned unchanged.
pub fn canonical_name(name: &str) -> String {
    let split = ACRONYM_BOUNDARY.replace_all(name.trim(), "${1}_${2}");
    let split = CAMEL_BOUNDARY.replace_all(&split, "${1}_${2}");
    let lower = split.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}
