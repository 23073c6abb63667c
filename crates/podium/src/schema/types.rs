//! Core type definitions for schema representation.

use serde::{Deserialize, Serialize};

/// Declared semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Text values.
    String,
    /// Whole numbers (64-bit signed).
    Integer,
    /// Finite floating-point numbers.
    Float,
}

impl ValueType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }

    /// Lower-case name used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "str" | "text" => Ok(ValueType::String),
            "integer" | "int" => Ok(ValueType::Integer),
            "float" | "double" => Ok(ValueType::Float),
            _ => Err(format!("Unknown type: {}. Use string, integer, or float.", s)),
        }
    }
}
