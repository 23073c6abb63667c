//! Row-wise derived columns.

use indexmap::IndexMap;

use crate::dataset::{Dataset, Row, Value};
use crate::error::{PodiumError, Result};
use crate::schema::{Column, ValueType};

/// Compute a column from each row, replacing a same-named column in place.
///
/// The column is required when `f` never returns null. Values that do not
/// conform to `value_type` fail with `TypeMismatch`.
pub fn with_column<F>(dataset: &Dataset, name: &str, value_type: ValueType, f: F) -> Result<Dataset>
where
    F: Fn(&Row) -> Value,
{
    let values: Vec<Value> = dataset.rows.iter().map(&f).collect();
    if let Some(bad) = values.iter().find(|v| !v.conforms_to(value_type)) {
        return Err(PodiumError::TypeMismatch {
            column: name.to_string(),
            expected: value_type.to_string(),
            found: bad.type_name().to_string(),
        });
    }
    let required = values.iter().all(|v| !v.is_null());
    let column = if required {
        Column::required(name, value_type)
    } else {
        Column::new(name, value_type)
    };

    let mut schema = dataset.schema.clone();
    let position = schema.index_of(name);
    match position {
        Some(index) => schema.columns[index] = column,
        None => schema.columns.push(column),
    }

    let rows = dataset
        .rows
        .iter()
        .zip(values)
        .map(|(row, value)| {
            let mut row = row.clone();
            match position {
                Some(index) => row[index] = value,
                None => row.push(value),
            }
            row
        })
        .collect();

    Ok(Dataset {
        name: dataset.name.clone(),
        schema,
        rows,
        provenance: None,
    })
}

fn string_source(dataset: &Dataset, source: &str) -> Result<usize> {
    let index = dataset.column_index(source)?;
    let found = dataset.schema.columns[index].value_type;
    if found != ValueType::String {
        return Err(PodiumError::TypeMismatch {
            column: source.to_string(),
            expected: ValueType::String.to_string(),
            found: found.to_string(),
        });
    }
    Ok(index)
}

/// Upper-cased copy of a string column. Nulls stay null.
pub fn upper(dataset: &Dataset, source: &str, output: &str) -> Result<Dataset> {
    let index = string_source(dataset, source)?;
    with_column(dataset, output, ValueType::String, |row| match &row[index] {
        Value::String(s) => Value::String(s.to_uppercase()),
        _ => Value::Null,
    })
}

/// Map a column's values onto named categories.
///
/// `categories` maps each category to its member values (compared by their
/// display form); the first category listing a value wins. Anything else,
/// nulls included, becomes `fallback`.
pub fn categorize(
    dataset: &Dataset,
    source: &str,
    output: &str,
    categories: &IndexMap<String, Vec<String>>,
    fallback: &str,
) -> Result<Dataset> {
    let index = dataset.column_index(source)?;
    let lookup: IndexMap<&str, &str> = categories
        .iter()
        .rev()
        .flat_map(|(category, members)| members.iter().map(move |m| (m.as_str(), category.as_str())))
        .collect();

    with_column(dataset, output, ValueType::String, |row| {
        let value = &row[index];
        let category = if value.is_null() {
            None
        } else {
            lookup.get(value.to_string().as_str()).copied()
        };
        Value::from(category.unwrap_or(fallback))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::Schema;

    fn athletes() -> Dataset {
        Dataset::from_rows(
            "athletes",
            Schema::with_columns(vec![
                Column::required("person_name", ValueType::String),
                Column::new("athlete_country", ValueType::String),
            ]),
            vec![
                vec!["LEDECKY Katie".into(), "United States of America".into()],
                vec!["DUJARDIN Charlotte".into(), "Great Britain".into()],
                vec!["NOBODY".into(), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_upper() {
        let out = upper(&athletes(), "athlete_country", "upper_country").unwrap();
        assert_eq!(out.rows[0][2], Value::from("UNITED STATES OF AMERICA"));
        assert_eq!(out.rows[2][2], Value::Null);
        assert!(!out.schema.columns[2].required);
    }

    #[test]
    fn test_categorize_with_fallback() {
        let mut regions = IndexMap::new();
        regions.insert(
            "North America".to_string(),
            vec!["United States of America".to_string(), "Canada".to_string()],
        );
        regions.insert("Europe".to_string(), vec!["Great Britain".to_string()]);

        let out = categorize(&athletes(), "athlete_country", "region", &regions, "Other").unwrap();
        let got: Vec<&Value> = out.rows.iter().map(|r| &r[2]).collect();
        assert_eq!(
            got,
            vec![&Value::from("North America"), &Value::from("Europe"), &Value::from("Other")]
        );
        assert!(out.schema.columns[2].required);
    }

    #[test]
    fn test_with_column_replaces_in_place() {
        let out = with_column(&athletes(), "person_name", ValueType::Integer, |_| Value::Integer(1)).unwrap();
        assert_eq!(out.schema.column_names(), vec!["person_name", "athlete_country"]);
        assert_eq!(out.rows[1][0], Value::Integer(1));
    }

    #[test]
    fn test_with_column_checks_type() {
        let err = with_column(&athletes(), "x", ValueType::Integer, |_| Value::from("a")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_upper_requires_string_column() {
        let ds = with_column(&athletes(), "n", ValueType::Integer, |_| Value::Integer(1)).unwrap();
        assert_eq!(upper(&ds, "n", "u").unwrap_err().kind(), ErrorKind::TypeMismatch);
    }
}
