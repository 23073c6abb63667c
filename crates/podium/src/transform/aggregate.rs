//! Grouped aggregation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Row, Value};
use crate::error::{PodiumError, Result};
use crate::schema::{Column, Schema, ValueType};

/// A pure aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Number of non-null values (or rows, without a source column).
    Count,
    /// Sum of numeric values.
    Sum,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
    /// Arithmetic mean of numeric values.
    Mean,
    /// First non-null value in input order.
    First,
}

impl Reducer {
    /// Output type of this reducer over a column of `input` type.
    pub fn output_type(&self, column: &str, input: Option<ValueType>) -> Result<ValueType> {
        match (self, input) {
            (Reducer::Count, _) => Ok(ValueType::Integer),
            (Reducer::Mean, Some(t)) if t.is_numeric() => Ok(ValueType::Float),
            (Reducer::Sum, Some(t)) if t.is_numeric() => Ok(t),
            (Reducer::Min | Reducer::Max | Reducer::First, Some(t)) => Ok(t),
            (_, found) => Err(PodiumError::TypeMismatch {
                column: column.to_string(),
                expected: format!("a numeric column for {}", self.label()),
                found: found.map(|t| t.to_string()).unwrap_or_else(|| "no column".to_string()),
            }),
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Reducer::Count => "count",
            Reducer::Sum => "sum",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Mean => "mean",
            Reducer::First => "first",
        }
    }
}

/// One output column of an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Source column; `None` is only valid for `Count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Reducer to apply.
    pub reducer: Reducer,
}

impl Metric {
    /// Count rows.
    pub fn count() -> Self {
        Self {
            column: None,
            reducer: Reducer::Count,
        }
    }

    /// Apply a reducer to a column.
    pub fn of(column: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            column: Some(column.into()),
            reducer,
        }
    }

    /// Sum a column.
    pub fn sum(column: impl Into<String>) -> Self {
        Self::of(column, Reducer::Sum)
    }

    /// Maximum of a column.
    pub fn max(column: impl Into<String>) -> Self {
        Self::of(column, Reducer::Max)
    }
}

/// Stand-in value fed to column-less counts.
static ROW_MARKER: Value = Value::Integer(1);

/// Running state of one reducer.
#[derive(Debug, Clone)]
pub(crate) enum Accumulator {
    Count(i64),
    SumInt(Option<i64>),
    SumFloat(Option<f64>),
    Min(Option<Value>),
    Max(Option<Value>),
    Mean { sum: f64, n: usize },
    First(Option<Value>),
}

impl Accumulator {
    pub(crate) fn new(reducer: Reducer, input: Option<ValueType>) -> Self {
        match reducer {
            Reducer::Count => Accumulator::Count(0),
            Reducer::Sum if input == Some(ValueType::Integer) => Accumulator::SumInt(None),
            Reducer::Sum => Accumulator::SumFloat(None),
            Reducer::Min => Accumulator::Min(None),
            Reducer::Max => Accumulator::Max(None),
            Reducer::Mean => Accumulator::Mean { sum: 0.0, n: 0 },
            Reducer::First => Accumulator::First(None),
        }
    }

    pub(crate) fn push(&mut self, value: &Value, column: &str) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::SumInt(total) => {
                let v = value.as_i64().unwrap_or_default();
                let next = total
                    .unwrap_or(0)
                    .checked_add(v)
                    .ok_or_else(|| overflow(column, "integer"))?;
                *total = Some(next);
            }
            Accumulator::SumFloat(total) => {
                *total = Some(finite_sum(total.unwrap_or(0.0), value, column)?);
            }
            Accumulator::Min(current) => {
                if current.as_ref().is_none_or(|c| value < c) {
                    *current = Some(value.clone());
                }
            }
            Accumulator::Max(current) => {
                if current.as_ref().is_none_or(|c| value > c) {
                    *current = Some(value.clone());
                }
            }
            Accumulator::Mean { sum, n } => {
                *sum = finite_sum(*sum, value, column)?;
                *n += 1;
            }
            Accumulator::First(current) => {
                if current.is_none() {
                    *current = Some(value.clone());
                }
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Value {
        match self {
            Accumulator::Count(n) => Value::Integer(n),
            Accumulator::SumInt(total) => total.into(),
            Accumulator::SumFloat(total) => total.into(),
            Accumulator::Min(v) | Accumulator::Max(v) | Accumulator::First(v) => {
                v.unwrap_or(Value::Null)
            }
            Accumulator::Mean { n: 0, .. } => Value::Null,
            Accumulator::Mean { sum, n } => Value::Float(sum / n as f64),
        }
    }
}

/// Float totals must stay finite; `inf` has no faithful JSON form.
fn finite_sum(total: f64, value: &Value, column: &str) -> Result<f64> {
    let next = total + value.as_f64().unwrap_or_default();
    if next.is_finite() {
        Ok(next)
    } else {
        Err(overflow(column, "float"))
    }
}

fn overflow(column: &str, range: &str) -> PodiumError {
    PodiumError::TypeMismatch {
        column: column.to_string(),
        expected: format!("a sum within the {} range", range),
        found: "overflow".to_string(),
    }
}

/// Group rows and reduce each group.
///
/// Emits one row per distinct combination of `group_by` values, sorted
/// ascending by those values (ties keep first-seen order). With no group
/// columns a non-empty input yields a single row and an empty input none.
pub fn aggregate<S: AsRef<str>>(
    dataset: &Dataset,
    group_by: &[S],
    metrics: &IndexMap<String, Metric>,
) -> Result<Dataset> {
    let group_indices = dataset.column_indices(group_by)?;

    let mut columns: Vec<Column> = group_indices
        .iter()
        .map(|&i| dataset.schema.columns[i].clone())
        .collect();

    let mut sources = Vec::with_capacity(metrics.len());
    let mut prototypes = Vec::with_capacity(metrics.len());
    for (name, metric) in metrics {
        if columns.iter().any(|c| &c.name == name) {
            return Err(PodiumError::Config(format!(
                "metric '{}' collides with a group column",
                name
            )));
        }
        let (index, input_type) = match &metric.column {
            Some(column) => {
                let index = dataset.column_index(column)?;
                (Some(index), Some(dataset.schema.columns[index].value_type))
            }
            None => (None, None),
        };
        let label = metric.column.as_deref().unwrap_or(name);
        let output_type = metric.reducer.output_type(label, input_type)?;
        columns.push(if metric.reducer == Reducer::Count {
            Column::required(name.clone(), output_type)
        } else {
            Column::new(name.clone(), output_type)
        });
        sources.push((index, label.to_string()));
        prototypes.push(Accumulator::new(metric.reducer, input_type));
    }

    let mut groups: IndexMap<Vec<Value>, Vec<Accumulator>> = IndexMap::new();
    for row in &dataset.rows {
        let key: Vec<Value> = group_indices.iter().map(|&i| row[i].clone()).collect();
        let accumulators = groups.entry(key).or_insert_with(|| prototypes.clone());
        for (acc, (index, label)) in accumulators.iter_mut().zip(&sources) {
            let value = index.map(|i| &row[i]).unwrap_or(&ROW_MARKER);
            acc.push(value, label)?;
        }
    }

    let mut entries: Vec<(Vec<Value>, Vec<Accumulator>)> = groups.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let rows: Vec<Row> = entries
        .into_iter()
        .map(|(mut key, accumulators)| {
            key.extend(accumulators.into_iter().map(Accumulator::finish));
            key
        })
        .collect();

    Ok(Dataset {
        name: dataset.name.clone(),
        schema: Schema::with_columns(columns),
        rows,
        provenance: None,
    })
}
