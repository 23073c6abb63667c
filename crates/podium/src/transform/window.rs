//! Window functions over partitions of ordered rows.

use std::cmp::Ordering;

use super::aggregate::{Accumulator, Reducer};
use crate::dataset::{Dataset, Row, Value};
use crate::error::Result;
use crate::schema::{Column, ValueType};

/// Partitioning and ordering of a window.
#[derive(Debug, Clone)]
pub struct WindowSpec<'a> {
    /// Columns splitting rows into independent windows.
    pub partition_by: &'a [String],
    /// Columns ordering rows inside a window.
    pub order_by: &'a [String],
    /// Order from largest to smallest.
    pub descending: bool,
}

/// A window resolved against one dataset.
struct Frame {
    partition: Vec<usize>,
    order: Vec<usize>,
    descending: bool,
}

impl Frame {
    fn resolve(dataset: &Dataset, spec: &WindowSpec<'_>) -> Result<Self> {
        Ok(Self {
            partition: dataset.column_indices(spec.partition_by)?,
            order: dataset.column_indices(spec.order_by)?,
            descending: spec.descending,
        })
    }

    fn same_partition(&self, a: &Row, b: &Row) -> bool {
        self.partition.iter().all(|&i| a[i] == b[i])
    }

    fn peers(&self, a: &Row, b: &Row) -> bool {
        self.same_partition(a, b) && self.order.iter().all(|&i| a[i] == b[i])
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let by_partition = self
            .partition
            .iter()
            .map(|&i| a[i].cmp(&b[i]))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal);
        by_partition.then_with(|| {
            let ordering = self
                .order
                .iter()
                .map(|&i| a[i].cmp(&b[i]))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal);
            if self.descending { ordering.reverse() } else { ordering }
        })
    }

    /// Rows sorted by partition then order, stable for ties.
    fn sorted(&self, rows: &[Row]) -> Vec<Row> {
        let mut rows = rows.to_vec();
        rows.sort_by(|a, b| self.compare(a, b));
        rows
    }
}

/// Add (or replace) a column on every row.
fn put_column(dataset: &Dataset, rows: Vec<Row>, column: Column) -> Dataset {
    let mut schema = dataset.schema.clone();
    let rows = match schema.index_of(&column.name) {
        Some(index) => {
            schema.columns[index] = column;
            rows.into_iter()
                .map(|mut row| {
                    let value = row.pop().unwrap_or_default();
                    row[index] = value;
                    row
                })
                .collect()
        }
        None => {
            schema.columns.push(column);
            rows
        }
    };
    Dataset {
        name: dataset.name.clone(),
        schema,
        rows,
        provenance: None,
    }
}

/// SQL `rank()`: peers share a rank and the next rank skips past them.
///
/// Output rows are ordered by partition then window order. Nulls sort first
/// ascending and last descending.
pub fn rank(dataset: &Dataset, spec: &WindowSpec<'_>, output: &str) -> Result<Dataset> {
    let frame = Frame::resolve(dataset, spec)?;
    let mut rows = frame.sorted(&dataset.rows);

    let mut position = 0i64;
    let mut current = 0i64;
    for i in 0..rows.len() {
        if i == 0 || !frame.same_partition(&rows[i - 1], &rows[i]) {
            position = 0;
        }
        position += 1;
        if position == 1 || !frame.peers(&rows[i - 1], &rows[i]) {
            current = position;
        }
        rows[i].push(Value::Integer(current));
    }

    Ok(put_column(dataset, rows, Column::required(output, ValueType::Integer)))
}

/// Running total of `source` over the window.
///
/// Peers share the total of the whole peer group, as with the default SQL
/// `RANGE` frame. The total is null until a non-null value has been seen.
pub fn cumulative_sum(
    dataset: &Dataset,
    spec: &WindowSpec<'_>,
    source: &str,
    output: &str,
) -> Result<Dataset> {
    let frame = Frame::resolve(dataset, spec)?;
    let source_index = dataset.column_index(source)?;
    let source_type = dataset.schema.columns[source_index].value_type;
    let output_type = Reducer::Sum.output_type(source, Some(source_type))?;

    let mut rows = frame.sorted(&dataset.rows);
    let mut running = Accumulator::new(Reducer::Sum, Some(source_type));
    let mut start = 0;
    while start < rows.len() {
        if start == 0 || !frame.same_partition(&rows[start - 1], &rows[start]) {
            running = Accumulator::new(Reducer::Sum, Some(source_type));
        }
        let mut end = start + 1;
        while end < rows.len() && frame.peers(&rows[start], &rows[end]) {
            end += 1;
        }
        for row in &rows[start..end] {
            running.push(&row[source_index], source)?;
        }
        let total = running.clone().finish();
        for row in &mut rows[start..end] {
            row.push(total.clone());
        }
        start = end;
    }

    Ok(put_column(dataset, rows, Column::new(output, output_type)))
}

/// The `n` rows with the largest `column` values, nulls last, ties in
/// input order.
pub fn top_n(dataset: &Dataset, column: &str, n: usize) -> Result<Dataset> {
    let index = dataset.column_index(column)?;
    let mut rows = dataset.rows.clone();
    rows.sort_by(|a, b| b[index].cmp(&a[index]));
    rows.truncate(n);
    Ok(Dataset {
        name: dataset.name.clone(),
        schema: dataset.schema.clone(),
        rows,
        provenance: None,
    })
}
