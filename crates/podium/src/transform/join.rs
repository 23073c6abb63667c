//! Relational joins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Row, Value};
use crate::error::{PodiumError, Result};
use crate::schema::{Column, Schema};

/// Suffix for right-hand columns whose names collide with the left side.
const RIGHT_SUFFIX: &str = "_right";

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Only matching rows.
    #[default]
    Inner,
    /// Every left row, matched or not.
    Left,
    /// Every row from both sides.
    Outer,
}

/// Join on columns that share a name on both sides.
pub fn join<S: AsRef<str>>(left: &Dataset, right: &Dataset, on: &[S], kind: JoinKind) -> Result<Dataset> {
    let pairs: Vec<(&str, &str)> = on.iter().map(|c| (c.as_ref(), c.as_ref())).collect();
    join_on(left, right, &pairs, kind)
}

/// Join on (left column, right column) pairs.
///
/// Same-named key pairs collapse into one output column; differently named
/// right keys are kept as ordinary columns. Null keys never match. Output
/// order: left rows in order, each followed by its matches in right order,
/// then (for outer joins) unmatched right rows in order.
pub fn join_on(
    left: &Dataset,
    right: &Dataset,
    on: &[(&str, &str)],
    kind: JoinKind,
) -> Result<Dataset> {
    if on.is_empty() {
        return Err(PodiumError::Config("join requires at least one key column".to_string()));
    }

    let mut left_keys = Vec::with_capacity(on.len());
    let mut right_keys = Vec::with_capacity(on.len());
    for (l, r) in on {
        let li = left.column_index(l)?;
        let ri = right.column_index(r)?;
        let lt = left.schema.columns[li].value_type;
        let rt = right.schema.columns[ri].value_type;
        if lt != rt {
            return Err(PodiumError::JoinKeyMismatch {
                column: if l == r { l.to_string() } else { format!("{}={}", l, r) },
                left: lt.to_string(),
                right: rt.to_string(),
            });
        }
        left_keys.push(li);
        right_keys.push(ri);
    }

    // Right key columns merged into a same-named left key column.
    let merged: HashMap<usize, usize> = on
        .iter()
        .zip(left_keys.iter().zip(&right_keys))
        .filter(|((l, r), _)| l == r)
        .map(|(_, (&li, &ri))| (ri, li))
        .collect();
    let right_kept: Vec<usize> = (0..right.column_count())
        .filter(|i| !merged.contains_key(i))
        .collect();

    let mut columns: Vec<Column> = left
        .schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            // Unmatched right rows fill a merged key from the right side,
            // every other left column with null.
            let nullable_in_outer = match merged.iter().find(|&(_, &li)| li == i) {
                Some((&ri, _)) => !right.schema.columns[ri].required,
                None => true,
            };
            if kind == JoinKind::Outer && nullable_in_outer {
                c.nullable()
            } else {
                c.clone()
            }
        })
        .collect();
    for &ri in &right_kept {
        let column = &right.schema.columns[ri];
        let mut name = column.name.clone();
        while columns.iter().any(|c| c.name == name) {
            name.push_str(RIGHT_SUFFIX);
        }
        let renamed = column.renamed(name);
        columns.push(if kind == JoinKind::Inner { renamed } else { renamed.nullable() });
    }

    let mut index: HashMap<Vec<&Value>, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows.iter().enumerate() {
        let key: Vec<&Value> = right_keys.iter().map(|&i| &row[i]).collect();
        if key.iter().any(|v| v.is_null()) {
            continue;
        }
        index.entry(key).or_default().push(row_idx);
    }

    let mut right_matched = vec![false; right.row_count()];
    let mut rows: Vec<Row> = Vec::new();

    for left_row in &left.rows {
        let key: Vec<&Value> = left_keys.iter().map(|&i| &left_row[i]).collect();
        let matches = if key.iter().any(|v| v.is_null()) {
            None
        } else {
            index.get(&key)
        };

        match matches {
            Some(matches) => {
                for &ri in matches {
                    right_matched[ri] = true;
                    let mut row = left_row.clone();
                    row.extend(right_kept.iter().map(|&c| right.rows[ri][c].clone()));
                    rows.push(row);
                }
            }
            None if kind != JoinKind::Inner => {
                let mut row = left_row.clone();
                row.extend(right_kept.iter().map(|_| Value::Null));
                rows.push(row);
            }
            None => {}
        }
    }

    if kind == JoinKind::Outer {
        for (ri, right_row) in right.rows.iter().enumerate() {
            if right_matched[ri] {
                continue;
            }
            let mut row = vec![Value::Null; left.column_count()];
            for (&r, &l) in &merged {
                row[l] = right_row[r].clone();
            }
            row.extend(right_kept.iter().map(|&c| right_row[c].clone()));
            rows.push(row);
        }
    }

    Ok(Dataset {
        name: format!("{}_{}", left.name, right.name),
        schema: Schema::with_columns(columns),
        rows,
        provenance: None,
    })
}
