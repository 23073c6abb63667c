//! Typed ingestion of delimited sources.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::parser::{Parser, ParserConfig};
use super::source::{RawTable, SourceMetadata};
use crate::dataset::{Dataset, Row, Value};
use crate::error::{PodiumError, Result};
use crate::run::RunContext;
use crate::schema::{Schema, SchemaRegistry, ValueType};

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Field delimiter (None = auto-detect).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    /// Row-level errors tolerated before a load is aborted.
    #[serde(default = "default_max_row_errors")]
    pub max_row_errors: usize,
    /// String columns read as written: only blank cells are null there,
    /// so text such as `NA` or `-` survives.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub literal_columns: Vec<String>,
}

fn default_max_row_errors() -> usize {
    100
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_row_errors: default_max_row_errors(),
            literal_columns: Vec::new(),
        }
    }
}

impl LoaderConfig {
    /// Parser settings derived from this configuration.
    pub fn parser_config(&self) -> Result<ParserConfig> {
        let delimiter = match self.delimiter {
            None => None,
            Some(c) if c.is_ascii() && c != '"' && c != '\n' => Some(c as u8),
            Some(c) => {
                return Err(PodiumError::Config(format!(
                    "Delimiter {:?} must be a single ASCII character other than quote or newline",
                    c
                )));
            }
        };
        Ok(ParserConfig {
            delimiter,
            ..ParserConfig::default()
        })
    }
}

/// A row-level problem found while coercing a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    /// Offending column, `None` for record-level problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// The raw text that failed.
    pub value: String,
    /// What went wrong.
    pub message: String,
}

impl RowError {
    /// The equivalent `ParseError`.
    pub fn to_error(&self) -> PodiumError {
        PodiumError::Parse {
            row: self.row,
            column: self.column.clone().unwrap_or_else(|| "*".to_string()),
            message: self.message.clone(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Result of loading one source.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Rows that coerced cleanly.
    pub dataset: Dataset,
    /// Rows that did not, one entry per offending cell or record.
    pub errors: Vec<RowError>,
    /// Provenance of the source file.
    pub source: SourceMetadata,
}

/// Reads delimited files into typed datasets using the schema registry.
pub struct Loader<'a> {
    registry: &'a SchemaRegistry,
    parser: Parser,
    max_row_errors: usize,
    literal_columns: Vec<String>,
}

impl<'a> Loader<'a> {
    /// Create a loader.
    pub fn new(registry: &'a SchemaRegistry, config: &LoaderConfig) -> Result<Self> {
        Ok(Self {
            registry,
            parser: Parser::with_config(config.parser_config()?),
            max_row_errors: config.max_row_errors,
            literal_columns: config.literal_columns.clone(),
        })
    }

    /// Load a source file for a dataset kind.
    ///
    /// The verbatim text table is written to the raw tier of the run
    /// before coercion, so the raw tier always mirrors the input.
    pub fn load(
        &self,
        ctx: &RunContext,
        source_path: impl AsRef<Path>,
        kind: &str,
    ) -> Result<LoadOutcome> {
        let schema = self.registry.get_schema(kind)?;
        let (raw, source) = self.parser.parse_file(source_path)?;
        header_positions(kind, schema, &raw.headers)?;

        ctx.write_raw(kind, &raw, &source)?;
        self.coerce(kind, &raw, source)
    }

    /// Coerce an already-parsed table without touching any store.
    pub fn coerce(&self, kind: &str, raw: &RawTable, source: SourceMetadata) -> Result<LoadOutcome> {
        let schema = self.registry.get_schema(kind)?;
        let positions = header_positions(kind, schema, &raw.headers)?;

        let mut rows: Vec<Row> = Vec::with_capacity(raw.row_count());
        let mut errors = Vec::new();

        for (row_idx, record) in raw.rows.iter().enumerate() {
            let row_number = row_idx + 1;
            if record.len() != raw.column_count() {
                errors.push(RowError {
                    row: row_number,
                    column: None,
                    value: record.join(&(raw.delimiter as char).to_string()),
                    message: format!(
                        "expected {} fields, found {}",
                        raw.column_count(),
                        record.len()
                    ),
                });
                continue;
            }

            let mut row = Vec::with_capacity(schema.column_count());
            let mut row_ok = true;
            for (column, &position) in schema.columns.iter().zip(&positions) {
                let text = &record[position];
                let literal = self.literal_columns.contains(&column.name);
                match coerce_cell(text, column.value_type, literal) {
                    Ok(value) => row.push(value),
                    Err(message) => {
                        row_ok = false;
                        errors.push(RowError {
                            row: row_number,
                            column: Some(column.name.clone()),
                            value: text.clone(),
                            message,
                        });
                    }
                }
            }
            if row_ok {
                rows.push(row);
            }
        }

        if errors.len() > self.max_row_errors {
            warn!(
                dataset = kind,
                errors = errors.len(),
                threshold = self.max_row_errors,
                "aborting ingestion"
            );
            return Err(PodiumError::IngestionAborted {
                dataset: kind.to_string(),
                errors: errors.len(),
                threshold: self.max_row_errors,
            });
        }
        if !errors.is_empty() {
            warn!(dataset = kind, errors = errors.len(), "rows rejected during ingestion");
        }
        debug!(dataset = kind, rows = rows.len(), "coerced source rows");

        let dataset = Dataset {
            name: kind.to_string(),
            schema: schema.clone(),
            rows,
            provenance: Some(source.clone()),
        };

        Ok(LoadOutcome {
            dataset,
            errors,
            source,
        })
    }
}

/// Map each schema column to its header position.
fn header_positions(kind: &str, schema: &Schema, headers: &[String]) -> Result<Vec<usize>> {
    let mut seen = std::collections::HashSet::new();
    let duplicates: Vec<&str> = headers
        .iter()
        .filter(|h| !seen.insert(h.as_str()))
        .map(|h| h.as_str())
        .collect();
    if !duplicates.is_empty() {
        return Err(PodiumError::SchemaMismatch {
            dataset: kind.to_string(),
            message: format!("duplicate header(s): {}", duplicates.join(", ")),
        });
    }

    let missing: Vec<&str> = schema
        .columns
        .iter()
        .filter(|c| !headers.contains(&c.name))
        .map(|c| c.name.as_str())
        .collect();
    let extra: Vec<&str> = headers
        .iter()
        .filter(|h| schema.get_column(h).is_none())
        .map(|h| h.as_str())
        .collect();

    if !missing.is_empty() || !extra.is_empty() {
        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("missing column(s): {}", missing.join(", ")));
        }
        if !extra.is_empty() {
            parts.push(format!("unexpected column(s): {}", extra.join(", ")));
        }
        return Err(PodiumError::SchemaMismatch {
            dataset: kind.to_string(),
            message: format!(
                "expected {} columns, found {} ({})",
                schema.column_count(),
                headers.len(),
                parts.join("; ")
            ),
        });
    }

    Ok(schema
        .columns
        .iter()
        .filter_map(|c| headers.iter().position(|h| *h == c.name))
        .collect())
}

/// Convert one text cell to a typed value.
fn coerce_cell(text: &str, value_type: ValueType, literal: bool) -> std::result::Result<Value, String> {
    let trimmed = text.trim();
    let is_null = if literal && value_type == ValueType::String {
        trimmed.is_empty()
    } else {
        RawTable::is_null_value(text)
    };
    if is_null {
        return Ok(Value::Null);
    }
    match value_type {
        ValueType::String => Ok(Value::String(trimmed.to_string())),
        ValueType::Integer => trimmed
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("'{}' is not a valid integer", trimmed)),
        ValueType::Float => match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(format!("'{}' is not a valid finite float", trimmed)),
        },
    }
}
