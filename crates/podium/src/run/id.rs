//! Run identifiers.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{PodiumError, Result};

/// Process-local tie breaker for runs started in the same microsecond.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identifier of one pipeline run.
///
/// Generated ids are a UTC timestamp plus a process-local sequence, so
/// they sort lexicographically in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// A fresh, unique run id.
    pub fn generate() -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}-{:06}",
            Utc::now().format("%Y%m%dT%H%M%S%.6fZ"),
            seq % 1_000_000
        ))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RunId {
    type Err = PodiumError;

    fn from_str(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && !s.starts_with('.')
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(PodiumError::Config(format!("Invalid run id '{}'", s)))
        }
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_sorted() {
        let ids: Vec<RunId> = (0..50).map(|_| RunId::generate()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn test_parse() {
        let id = RunId::generate();
        assert_eq!(id.as_str().parse::<RunId>().unwrap(), id);
        assert!("../etc".parse::<RunId>().is_err());
        assert!("".parse::<RunId>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let id: RunId = "20240801T120000.000000Z-000001".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"20240801T120000.000000Z-000001\"");
    }
}
