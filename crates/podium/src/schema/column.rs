//! Column definition.

use serde::{Deserialize, Serialize};

use super::types::ValueType;

/// Declared contract for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Whether every row must hold a non-null value.
    #[serde(default)]
    pub required: bool,
}

impl Column {
    /// Create an optional (nullable) column.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: false,
        }
    }

    /// Create a required column.
    pub fn required(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: true,
        }
    }

    /// Same column under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Same column with the required flag cleared.
    pub fn nullable(&self) -> Self {
        Self {
            required: false,
            ..self.clone()
        }
    }
}
