//! Per-dataset cleaning configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dataset::Value;

/// What to do with a null in a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FillPolicy {
    /// Remove the whole row.
    DropRow,
    /// Replace the null with a typed value.
    Default { value: Value },
    /// Keep the null and set a `<column>_missing` flag column to 1.
    FlagAndKeep,
}

impl FillPolicy {
    /// Fill with a default value.
    pub fn default_value(value: impl Into<Value>) -> Self {
        FillPolicy::Default {
            value: value.into(),
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FillPolicy::DropRow => "drop row",
            FillPolicy::Default { .. } => "default value",
            FillPolicy::FlagAndKeep => "flag and keep",
        }
    }
}

/// Cleaning rules for one dataset kind.
///
/// Column references may use either the source header name or the
/// canonical output name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningRules {
    /// Columns that identify a duplicate (None = the full row).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_keys: Option<Vec<String>>,
    /// Missing-value policy per column.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fill: IndexMap<String, FillPolicy>,
    /// Column renames applied before canonical naming.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rename: IndexMap<String, String>,
}

impl CleaningRules {
    /// Create empty rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deduplicate on a subset of columns.
    pub fn with_dedup_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.dedup_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Set the missing-value policy for a column.
    pub fn with_fill(mut self, column: impl Into<String>, policy: FillPolicy) -> Self {
        self.fill.insert(column.into(), policy);
        self
    }

    /// Rename a column.
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.insert(from.into(), to.into());
        self
    }
}

/// Suffix of the flag column added for `FlagAndKeep` columns.
pub const MISSING_FLAG_SUFFIX: &str = "_missing";
