//! Wide/long reshaping.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::aggregate::{Accumulator, Reducer};
use crate::dataset::{Dataset, Row, Value};
use crate::error::{PodiumError, Result};
use crate::schema::{Column, Schema, ValueType};

/// Long to wide: one output column per distinct `pivot_column` value.
///
/// Rows are grouped by `index` (sorted ascending) and each cell holds the
/// reduced `value_column` values for that (index, key) pair, or null when
/// the pair never occurs. Pivot columns are ordered by key value and named
/// after it.
///
/// The key column must be a String column, since keys become column names
/// and come back from [`unpivot`] as strings. Null keys and null values are
/// rejected: a null cell in the output always means "no such pair".
pub fn pivot<S: AsRef<str>>(
    dataset: &Dataset,
    index: &[S],
    pivot_column: &str,
    value_column: &str,
    reducer: Reducer,
) -> Result<Dataset> {
    let index_positions = dataset.column_indices(index)?;
    let key_position = dataset.column_index(pivot_column)?;
    let value_position = dataset.column_index(value_column)?;
    let key_type = dataset.schema.columns[key_position].value_type;
    if key_type != ValueType::String {
        return Err(PodiumError::TypeMismatch {
            column: pivot_column.to_string(),
            expected: ValueType::String.to_string(),
            found: key_type.to_string(),
        });
    }
    let value_type = dataset.schema.columns[value_position].value_type;
    let output_type = reducer.output_type(value_column, Some(value_type))?;

    let mut keys: BTreeSet<Value> = BTreeSet::new();
    let mut groups: IndexMap<Vec<Value>, IndexMap<Value, Accumulator>> = IndexMap::new();
    for (row_number, row) in dataset.rows.iter().enumerate() {
        let key = &row[key_position];
        for (column, cell) in [(pivot_column, key), (value_column, &row[value_position])] {
            if cell.is_null() {
                return Err(PodiumError::SchemaMismatch {
                    dataset: dataset.name.clone(),
                    message: format!("cannot pivot null '{}' in row {}", column, row_number + 1),
                });
            }
        }
        let group: Vec<Value> = index_positions.iter().map(|&i| row[i].clone()).collect();
        groups
            .entry(group)
            .or_default()
            .entry(key.clone())
            .or_insert_with(|| Accumulator::new(reducer, Some(value_type)))
            .push(&row[value_position], value_column)?;
        keys.insert(key.clone());
    }

    let mut columns: Vec<Column> = index_positions
        .iter()
        .map(|&i| dataset.schema.columns[i].clone())
        .collect();
    for key in &keys {
        let name = key.to_string();
        if columns.iter().any(|c| c.name == name) {
            return Err(PodiumError::Config(format!(
                "pivot value '{}' collides with an index column",
                name
            )));
        }
        columns.push(Column::new(name, output_type));
    }

    let mut entries: Vec<(Vec<Value>, IndexMap<Value, Accumulator>)> = groups.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let rows: Vec<Row> = entries
        .into_iter()
        .map(|(mut row, mut cells)| {
            for key in &keys {
                row.push(cells.swap_remove(key).map(Accumulator::finish).unwrap_or(Value::Null));
            }
            row
        })
        .collect();

    Ok(Dataset {
        name: dataset.name.clone(),
        schema: Schema::with_columns(columns),
        rows,
        provenance: None,
    })
}

/// Wide to long: each non-null `value_columns` cell becomes a row of
/// (index..., key, value), keys being the source column names.
///
/// All value columns must share one type.
pub fn unpivot<S: AsRef<str>, V: AsRef<str>>(
    dataset: &Dataset,
    index: &[S],
    value_columns: &[V],
    key_name: &str,
    value_name: &str,
) -> Result<Dataset> {
    let index_positions = dataset.column_indices(index)?;
    let value_positions = dataset.column_indices(value_columns)?;
    let first = value_positions.first().ok_or_else(|| {
        PodiumError::Config("unpivot requires at least one value column".to_string())
    })?;
    let value_type = dataset.schema.columns[*first].value_type;
    for &i in &value_positions {
        let column = &dataset.schema.columns[i];
        if column.value_type != value_type {
            return Err(PodiumError::TypeMismatch {
                column: column.name.clone(),
                expected: value_type.to_string(),
                found: column.value_type.to_string(),
            });
        }
    }

    let mut columns: Vec<Column> = index_positions
        .iter()
        .map(|&i| dataset.schema.columns[i].clone())
        .collect();
    for name in [key_name, value_name] {
        if columns.iter().any(|c| c.name == name) || key_name == value_name {
            return Err(PodiumError::Config(format!(
                "unpivot output column '{}' is not unique",
                name
            )));
        }
    }
    columns.push(Column::required(key_name, ValueType::String));
    columns.push(Column::required(value_name, value_type));

    let mut rows: Vec<Row> = Vec::new();
    for row in &dataset.rows {
        for &vi in &value_positions {
            if row[vi].is_null() {
                continue;
            }
            let mut out: Row = index_positions.iter().map(|&i| row[i].clone()).collect();
            out.push(Value::String(dataset.schema.columns[vi].name.clone()));
            out.push(row[vi].clone());
            rows.push(out);
        }
    }

    Ok(Dataset {
        name: dataset.name.clone(),
        schema: Schema::with_columns(columns),
        rows,
        provenance: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long() -> Dataset {
        Dataset::from_rows(
            "medals_long",
            Schema::with_columns(vec![
                Column::required("country", ValueType::String),
                Column::new("medal", ValueType::String),
                Column::new("count", ValueType::Integer),
            ]),
            vec![
                vec!["USA".into(), "gold".into(), Value::Integer(39)],
                vec!["USA".into(), "silver".into(), Value::Integer(41)],
                vec!["CHN".into(), "gold".into(), Value::Integer(38)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pivot_sum() {
        let wide = pivot(&long(), &["country"], "medal", "count", Reducer::Sum).unwrap();
        assert_eq!(wide.schema.column_names(), vec!["country", "gold", "silver"]);
        assert_eq!(
            wide.rows,
            vec![
                vec!["CHN".into(), Value::Integer(38), Value::Null],
                vec!["USA".into(), Value::Integer(39), Value::Integer(41)],
            ]
        );
        wide.validate().unwrap();
    }

    #[test]
    fn test_unpivot_skips_nulls() {
        let wide = pivot(&long(), &["country"], "medal", "count", Reducer::Max).unwrap();
        let back = unpivot(&wide, &["country"], &["gold", "silver"], "medal", "count").unwrap();
        assert_eq!(back.row_count(), 3);
        assert_eq!(back.schema.column_names(), vec!["country", "medal", "count"]);
        assert!(back.rows.contains(&vec!["USA".into(), "silver".into(), Value::Integer(41)]));
    }

    #[test]
    fn test_pivot_rejects_nulls() {
        let mut with_null_key = long();
        with_null_key.rows.push(vec!["CHN".into(), Value::Null, Value::Integer(5)]);
        let err = pivot(&with_null_key, &["country"], "medal", "count", Reducer::Sum).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaMismatchError);

        let mut with_null_value = long();
        with_null_value.rows.push(vec!["CHN".into(), "silver".into(), Value::Null]);
        let err = pivot(&with_null_value, &["country"], "medal", "count", Reducer::First).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaMismatchError);
    }

    #[test]
    fn test_pivot_requires_string_keys() {
        let by_year = Dataset::from_rows(
            "medals_by_year",
            Schema::with_columns(vec![
                Column::required("country", ValueType::String),
                Column::required("year", ValueType::Integer),
                Column::new("gold", ValueType::Integer),
            ]),
            vec![
                vec!["USA".into(), Value::Integer(2021), Value::Integer(39)],
                vec!["CHN".into(), Value::Integer(2021), Value::Integer(38)],
            ],
        )
        .unwrap();
        let err = pivot(&by_year, &["country"], "year", "gold", Reducer::Sum).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_round_trip_keeps_every_triple() {
        let wide = pivot(&long(), &["country"], "medal", "count", Reducer::First).unwrap();
        let back = unpivot(&wide, &["country"], &["gold", "silver"], "medal", "count").unwrap();
        let mut expected = long().rows;
        let mut actual = back.rows;
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_unpivot_mixed_types_rejected() {
        let ds = Dataset::from_rows(
            "mixed",
            Schema::with_columns(vec![
                Column::required("id", ValueType::Integer),
                Column::new("a", ValueType::Integer),
                Column::new("b", ValueType::Float),
            ]),
            vec![],
        )
        .unwrap();
        let err = unpivot(&ds, &["id"], &["a", "b"], "k", "v").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TypeMismatch);
    }
}
