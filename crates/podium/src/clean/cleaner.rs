//! Cleaning stage: type validation, missing values, dedup, canonical names.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::rules::{CleaningRules, FillPolicy, MISSING_FLAG_SUFFIX};
use crate::dataset::{Dataset, Row, Value};
use crate::error::{PodiumError, Result};
use crate::schema::{canonical_name, Column, DatasetDefinition, Schema, SchemaRegistry, ValueType};

/// Counts describing what cleaning did to a dataset.
///
/// `rows_in == rows_out + duplicates_removed + rows_dropped` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Dataset kind.
    pub dataset: String,
    /// Rows received.
    pub rows_in: usize,
    /// Rows removed as duplicates.
    pub duplicates_removed: usize,
    /// Rows with at least one value filled by a default.
    pub rows_filled: usize,
    /// Rows with at least one missing-value flag set.
    pub rows_flagged: usize,
    /// Rows removed for missing values or type mismatches.
    pub rows_dropped: usize,
    /// Subset of `rows_dropped` caused by a type mismatch.
    pub type_mismatches: usize,
    /// Rows emitted.
    pub rows_out: usize,
    /// Filled values per output column.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fills_by_column: IndexMap<String, usize>,
}

/// How one declared column maps from input to output.
struct ColumnPlan {
    input_index: usize,
    output: Column,
    policy: Option<FillPolicy>,
    flag_input_index: Option<usize>,
}

/// Applies each dataset kind's cleaning rules.
pub struct Cleaner<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Cleaner<'a> {
    /// Create a cleaner backed by the registry.
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Clean a dataset whose name is a registered kind.
    pub fn clean(&self, dataset: &Dataset) -> Result<(Dataset, CleaningReport)> {
        let definition = self.registry.definition(&dataset.name)?;
        clean_with(definition, dataset)
    }
}

/// Clean a dataset against an explicit definition.
pub fn clean_with(
    definition: &DatasetDefinition,
    dataset: &Dataset,
) -> Result<(Dataset, CleaningReport)> {
    let rules = &definition.cleaning;
    let plans = plan_columns(definition, dataset)?;
    check_extra_columns(dataset, &plans)?;

    let mut output_columns: Vec<Column> = plans.iter().map(|p| p.output.clone()).collect();
    let flagged: Vec<usize> = plans
        .iter()
        .enumerate()
        .filter(|(_, p)| matches!(p.policy, Some(FillPolicy::FlagAndKeep)))
        .map(|(i, _)| i)
        .collect();
    for &i in &flagged {
        output_columns.push(Column::required(
            flag_column_name(&plans[i].output.name),
            ValueType::Integer,
        ));
    }
    let output_schema = Schema::with_columns(output_columns);

    let dedup_indices = match &rules.dedup_keys {
        None => None,
        Some(keys) => Some(resolve_keys(definition, &output_schema, keys)?),
    };

    let mut report = CleaningReport {
        dataset: definition.kind.clone(),
        rows_in: dataset.row_count(),
        ..CleaningReport::default()
    };
    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    let mut rows: Vec<Row> = Vec::new();

    'rows: for input in &dataset.rows {
        if input.len() != dataset.column_count() {
            return Err(PodiumError::SchemaMismatch {
                dataset: dataset.name.clone(),
                message: "row width differs from the dataset schema".to_string(),
            });
        }

        let mut row: Row = Vec::with_capacity(output_schema.column_count());
        let mut flags = Vec::with_capacity(flagged.len());
        let mut filled_here = Vec::new();

        for plan in &plans {
            let value = &input[plan.input_index];
            if !value.conforms_to(plan.output.value_type) {
                report.type_mismatches += 1;
                report.rows_dropped += 1;
                continue 'rows;
            }
            if !value.is_null() {
                row.push(value.clone());
                if let Some(FillPolicy::FlagAndKeep) = plan.policy {
                    flags.push(previous_flag(input, plan.flag_input_index));
                }
                continue;
            }

            match &plan.policy {
                Some(FillPolicy::DropRow) => {
                    report.rows_dropped += 1;
                    continue 'rows;
                }
                Some(FillPolicy::Default { value: fill }) => {
                    row.push(fill.clone());
                    filled_here.push(plan.output.name.clone());
                }
                Some(FillPolicy::FlagAndKeep) => {
                    row.push(Value::Null);
                    flags.push(Value::Integer(1));
                }
                None if plan.output.required => {
                    report.rows_dropped += 1;
                    continue 'rows;
                }
                None => row.push(Value::Null),
            }
        }

        let flagged_row = flags.iter().any(|f| *f == Value::Integer(1));
        row.extend(flags);

        let key = match &dedup_indices {
            None => row.clone(),
            Some(indices) => indices.iter().map(|&i| row[i].clone()).collect(),
        };
        if !seen.insert(key) {
            report.duplicates_removed += 1;
            continue;
        }

        if !filled_here.is_empty() {
            report.rows_filled += 1;
            for column in filled_here {
                *report.fills_by_column.entry(column).or_insert(0) += 1;
            }
        }
        if flagged_row {
            report.rows_flagged += 1;
        }
        rows.push(row);
    }

    report.rows_out = rows.len();
    if report.type_mismatches > 0 {
        warn!(
            dataset = %definition.kind,
            count = report.type_mismatches,
            "rows dropped for type mismatches"
        );
    }
    debug!(
        dataset = %definition.kind,
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        duplicates = report.duplicates_removed,
        dropped = report.rows_dropped,
        "cleaned dataset"
    );

    let cleansed = Dataset {
        name: dataset.name.clone(),
        schema: output_schema,
        rows,
        provenance: dataset.provenance.clone(),
    };
    cleansed.validate()?;

    Ok((cleansed, report))
}

/// Name of the flag column for a `FlagAndKeep` column.
pub fn flag_column_name(column: &str) -> String {
    format!("{}{}", column, MISSING_FLAG_SUFFIX)
}

/// Canonical output name of a declared source column.
pub fn output_name(rules: &CleaningRules, source: &str) -> String {
    let renamed = rules.rename.get(source).map(|s| s.as_str()).unwrap_or(source);
    canonical_name(renamed)
}

fn plan_columns(definition: &DatasetDefinition, dataset: &Dataset) -> Result<Vec<ColumnPlan>> {
    let rules = &definition.cleaning;
    let mut plans = Vec::with_capacity(definition.schema.column_count());

    for column in &definition.schema.columns {
        let output = output_name(rules, &column.name);
        let input_index = dataset
            .schema
            .index_of(&column.name)
            .or_else(|| dataset.schema.index_of(&output))
            .ok_or_else(|| PodiumError::SchemaMismatch {
                dataset: dataset.name.clone(),
                message: format!("column '{}' is missing", column.name),
            })?;

        let declared = &dataset.schema.columns[input_index];
        if declared.value_type != column.value_type {
            return Err(PodiumError::TypeMismatch {
                column: column.name.clone(),
                expected: column.value_type.to_string(),
                found: declared.value_type.to_string(),
            });
        }

        let policy = rules
            .fill
            .get(&column.name)
            .or_else(|| rules.fill.get(&output))
            .cloned();
        if let Some(FillPolicy::Default { value }) = &policy {
            if value.is_null() || !value.conforms_to(column.value_type) {
                return Err(PodiumError::Config(format!(
                    "default for '{}.{}' must be a non-null {}",
                    definition.kind, column.name, column.value_type
                )));
            }
        }

        let mut output_column = column.renamed(output.clone());
        if matches!(policy, Some(FillPolicy::FlagAndKeep)) {
            output_column = output_column.nullable();
        }

        plans.push(ColumnPlan {
            input_index,
            flag_input_index: dataset.schema.index_of(&flag_column_name(&output)),
            output: output_column,
            policy,
        });
    }

    Ok(plans)
}

/// Inputs may only carry declared columns plus flag columns of an earlier pass.
fn check_extra_columns(dataset: &Dataset, plans: &[ColumnPlan]) -> Result<()> {
    let used: HashSet<usize> = plans
        .iter()
        .flat_map(|p| std::iter::once(p.input_index).chain(p.flag_input_index))
        .collect();
    let extra: Vec<&str> = dataset
        .schema
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .map(|(_, c)| c.name.as_str())
        .collect();
    if extra.is_empty() {
        Ok(())
    } else {
        Err(PodiumError::SchemaMismatch {
            dataset: dataset.name.clone(),
            message: format!("unexpected column(s): {}", extra.join(", ")),
        })
    }
}

fn resolve_keys(definition: &DatasetDefinition, output: &Schema, keys: &[String]) -> Result<Vec<usize>> {
    keys.iter()
        .map(|key| {
            output
                .index_of(key)
                .or_else(|| output.index_of(&output_name(&definition.cleaning, key)))
                .ok_or_else(|| PodiumError::column_not_found(&definition.kind, key))
        })
        .collect()
}

fn previous_flag(input: &Row, flag_index: Option<usize>) -> Value {
    match flag_index.map(|i| &input[i]) {
        Some(Value::Integer(1)) => Value::Integer(1),
        _ => Value::Integer(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn definition(rules: CleaningRules) -> DatasetDefinition {
        DatasetDefinition::new(
            "medals",
            "Medals.csv",
            Schema::with_columns(vec![
                Column::required("TeamCountry", ValueType::String),
                Column::new("Gold", ValueType::Integer),
                Column::new("Rank by Total", ValueType::Integer),
            ]),
        )
        .with_cleaning(rules)
    }

    fn raw(definition: &DatasetDefinition, rows: Vec<Row>) -> Dataset {
        Dataset {
            name: "medals".to_string(),
            schema: definition.schema.clone(),
            rows,
            provenance: None,
        }
    }

    fn row(country: Option<&str>, gold: Option<i64>, rank: Option<i64>) -> Row {
        vec![country.into(), gold.into(), rank.into()]
    }

    #[test]
    fn test_canonical_names_and_rename() {
        let def = definition(CleaningRules::new().with_rename("TeamCountry", "MedalCountry"));
        let (out, _) = clean_with(&def, &raw(&def, vec![])).unwrap();
        assert_eq!(out.schema.column_names(), vec!["medal_country", "gold", "rank_by_total"]);
    }

    #[test]
    fn test_full_row_dedup_keeps_first() {
        let def = definition(CleaningRules::new());
        let input = raw(
            &def,
            vec![
                row(Some("USA"), Some(39), Some(1)),
                row(Some("USA"), Some(39), Some(1)),
                row(Some("CHN"), Some(38), Some(2)),
            ],
        );
        let (out, report) = clean_with(&def, &input).unwrap();
        assert_eq!(out.row_count(), 2);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(out.rows[0][0], Value::from("USA"));
    }

    #[test]
    fn test_key_dedup() {
        let def = definition(CleaningRules::new().with_dedup_keys(["TeamCountry"]));
        let input = raw(
            &def,
            vec![row(Some("USA"), Some(39), Some(1)), row(Some("USA"), Some(1), Some(9))],
        );
        let (out, report) = clean_with(&def, &input).unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.rows[0][1], Value::Integer(39));
        assert_eq!(report.duplicates_removed, 1);
    }

    #[test]
    fn test_fill_policies() {
        let def = definition(
            CleaningRules::new()
                .with_fill("Gold", FillPolicy::default_value(Value::Integer(0)))
                .with_fill("rank_by_total", FillPolicy::FlagAndKeep),
        );
        let input = raw(
            &def,
            vec![
                row(Some("USA"), None, Some(1)),
                row(None, Some(3), Some(2)),
                row(Some("JPN"), Some(27), None),
            ],
        );
        let (out, report) = clean_with(&def, &input).unwrap();

        assert_eq!(
            out.schema.column_names(),
            vec!["team_country", "gold", "rank_by_total", "rank_by_total_missing"]
        );
        assert!(!out.schema.columns[2].required);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0], vec!["USA".into(), Value::Integer(0), Value::Integer(1), Value::Integer(0)]);
        assert_eq!(out.rows[1], vec!["JPN".into(), Value::Integer(27), Value::Null, Value::Integer(1)]);

        assert_eq!(report.rows_in, 3);
        assert_eq!(report.rows_filled, 1);
        assert_eq!(report.rows_flagged, 1);
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(report.fills_by_column["gold"], 1);
        assert_eq!(
            report.rows_in,
            report.rows_out + report.duplicates_removed + report.rows_dropped
        );
    }

    #[test]
    fn test_clean_is_idempotent() {
        let def = definition(
            CleaningRules::new()
                .with_rename("TeamCountry", "MedalCountry")
                .with_fill("Gold", FillPolicy::default_value(Value::Integer(0)))
                .with_fill("Rank by Total", FillPolicy::FlagAndKeep),
        );
        let input = raw(
            &def,
            vec![
                row(Some("USA"), None, Some(1)),
                row(Some("USA"), Some(0), Some(1)),
                row(Some("ROC"), Some(20), None),
            ],
        );
        let (once, first) = clean_with(&def, &input).unwrap();
        let (twice, second) = clean_with(&def, &once).unwrap();

        assert_eq!(first.duplicates_removed, 1);
        assert_eq!(once, twice);
        assert_eq!(second.duplicates_removed, 0);
        assert_eq!(second.rows_dropped, 0);
    }

    #[test]
    fn test_type_mismatch_rows_are_dropped_and_counted() {
        let def = definition(CleaningRules::new());
        let input = raw(
            &def,
            vec![
                vec!["USA".into(), Value::from("many"), Value::Integer(1)],
                row(Some("CHN"), Some(38), Some(2)),
            ],
        );
        let (out, report) = clean_with(&def, &input).unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(report.type_mismatches, 1);
        assert_eq!(report.rows_dropped, 1);
    }

    #[test]
    fn test_invalid_default_is_config_error() {
        let def = definition(
            CleaningRules::new().with_fill("Gold", FillPolicy::default_value("zero")),
        );
        let err = clean_with(&def, &raw(&def, vec![])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_unknown_kind() {
        let registry = SchemaRegistry::new([definition(CleaningRules::new())]).unwrap();
        let ds = Dataset::new("judo", Schema::new());
        let err = Cleaner::new(&registry).clean(&ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDatasetKind);
    }
}
