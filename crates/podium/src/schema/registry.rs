//! Registry of dataset definitions keyed by dataset kind.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::clean::CleaningRules;
use crate::error::{PodiumError, Result};

use super::table::Schema;

/// Everything the pipeline knows about one dataset kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDefinition {
    /// Dataset kind (e.g. `medals`).
    pub kind: String,
    /// Source file name, resolved against the input directory.
    pub source: String,
    /// Expected columns of the source file.
    pub schema: Schema,
    /// Cleaning configuration.
    #[serde(default)]
    pub cleaning: CleaningRules,
}

impl DatasetDefinition {
    /// Create a definition with default cleaning rules.
    pub fn new(kind: impl Into<String>, source: impl Into<String>, schema: Schema) -> Self {
        Self {
            kind: kind.into(),
            source: source.into(),
            schema,
            cleaning: CleaningRules::default(),
        }
    }

    /// Set the cleaning rules.
    pub fn with_cleaning(mut self, cleaning: CleaningRules) -> Self {
        self.cleaning = cleaning;
        self
    }
}

/// Immutable lookup of dataset definitions.
///
/// Built once from configuration at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    definitions: IndexMap<String, DatasetDefinition>,
}

impl SchemaRegistry {
    /// Build a registry, rejecting duplicate kinds.
    pub fn new(definitions: impl IntoIterator<Item = DatasetDefinition>) -> Result<Self> {
        let mut map = IndexMap::new();
        for definition in definitions {
            if definition.schema.columns.is_empty() {
                return Err(PodiumError::Config(format!(
                    "Dataset kind '{}' declares no columns",
                    definition.kind
                )));
            }
            let kind = definition.kind.clone();
            if map.insert(kind.clone(), definition).is_some() {
                return Err(PodiumError::Config(format!(
                    "Dataset kind '{}' is registered twice",
                    kind
                )));
            }
        }
        Ok(Self { definitions: map })
    }

    /// Schema for a dataset kind.
    pub fn get_schema(&self, kind: &str) -> Result<&Schema> {
        self.definition(kind).map(|d| &d.schema)
    }

    /// Full definition for a dataset kind.
    pub fn definition(&self, kind: &str) -> Result<&DatasetDefinition> {
        self.definitions
            .get(kind)
            .ok_or_else(|| PodiumError::UnknownDatasetKind(kind.to_string()))
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(|k| k.as_str())
    }

    /// All definitions in declaration order.
    pub fn definitions(&self) -> impl Iterator<Item = &DatasetDefinition> {
        self.definitions.values()
    }

    /// Whether a kind is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.definitions.contains_key(kind)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
