//! Typed, schema-bound datasets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::error::{PodiumError, Result};
use crate::input::SourceMetadata;
use crate::schema::Schema;

/// One row, positionally aligned with its dataset's schema.
pub type Row = Vec<Value>;

/// A named collection of rows sharing a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name (the dataset kind for loaded data).
    pub name: String,
    /// Column contract.
    pub schema: Schema,
    /// Row data.
    pub rows: Vec<Row>,
    /// Where the data originally came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<SourceMetadata>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
            provenance: None,
        }
    }

    /// Create a dataset from rows, checking them against the schema.
    pub fn from_rows(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> Result<Self> {
        let dataset = Self {
            name: name.into(),
            schema,
            rows,
            provenance: None,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Same data under a different name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    /// Column position, or `ColumnNotFound`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| PodiumError::column_not_found(&self.name, name))
    }

    /// Positions for several columns.
    pub fn column_indices<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names.iter().map(|n| self.column_index(n.as_ref())).collect()
    }

    /// All values of one column.
    pub fn column_values(&self, name: &str) -> Result<impl Iterator<Item = &Value>> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[index]))
    }

    /// Cell lookup by row position and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.schema.index_of(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// A row as a column-name keyed map.
    pub fn row_map(&self, row: usize) -> Option<IndexMap<&str, &Value>> {
        let values = self.rows.get(row)?;
        Some(
            self.schema
                .columns
                .iter()
                .map(|c| c.name.as_str())
                .zip(values.iter())
                .collect(),
        )
    }

    /// Check every row against the schema: arity, types and required columns.
    pub fn validate(&self) -> Result<()> {
        let width = self.schema.column_count();
        for (row_idx, row) in self.rows.iter().enumerate() {
            if row.len() != width {
                return Err(PodiumError::SchemaMismatch {
                    dataset: self.name.clone(),
                    message: format!(
                        "row {} has {} values but the schema declares {} columns",
                        row_idx + 1,
                        row.len(),
                        width
                    ),
                });
            }
            for (column, value) in self.schema.columns.iter().zip(row) {
                if !value.conforms_to(column.value_type) {
                    return Err(PodiumError::TypeMismatch {
                        column: column.name.clone(),
                        expected: column.value_type.to_string(),
                        found: value.type_name().to_string(),
                    });
                }
                if column.required && value.is_null() {
                    return Err(PodiumError::SchemaMismatch {
                        dataset: self.name.clone(),
                        message: format!(
                            "required column '{}' is null in row {}",
                            column.name,
                            row_idx + 1
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
