//! Storage tiers.

use serde::{Deserialize, Serialize};

/// A stage of data maturity. Data only flows from lower to higher tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Source text exactly as ingested.
    Raw,
    /// Deduplicated, filled and schema-validated datasets.
    Cleansed,
    /// Certified datasets and derivations served to queries.
    Confirmed,
}

impl Tier {
    /// All tiers, lowest first.
    pub const ALL: [Tier; 3] = [Tier::Raw, Tier::Cleansed, Tier::Confirmed];

    /// Path segment used in the store layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Raw => "raw",
            Tier::Cleansed => "cleansed",
            Tier::Confirmed => "confirmed",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_ordered() {
        assert!(Tier::Raw < Tier::Cleansed);
        assert!(Tier::Cleansed < Tier::Confirmed);
        assert_eq!(serde_json::to_string(&Tier::Cleansed).unwrap(), "\"cleansed\"");
    }
}
