//! Declarative derivation steps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::aggregate::{aggregate, Metric, Reducer};
use super::derive::{categorize, upper};
use super::join::{join_on, JoinKind};
use super::reshape::{pivot, unpivot};
use super::window::{cumulative_sum, rank, top_n, WindowSpec};
use crate::dataset::Dataset;
use crate::error::{PodiumError, Result};

/// A named dataset produced by one transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    /// Output dataset name.
    pub name: String,

    /// Operation producing it.
    #[serde(flatten)]
    pub step: Step,
}

impl Derivation {
    /// Create a derivation.
    pub fn new(name: impl Into<String>, step: Step) -> Self {
        Self {
            name: name.into(),
            step,
        }
    }
}

/// A transformation step over named input datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Relational join. `right_on` defaults to `on`.
    Join {
        left: String,
        right: String,
        on: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        right_on: Vec<String>,
        #[serde(default)]
        kind: JoinKind,
    },

    /// Grouped aggregation.
    Aggregate {
        input: String,
        #[serde(default)]
        group_by: Vec<String>,
        metrics: IndexMap<String, Metric>,
    },

    /// Long to wide.
    Pivot {
        input: String,
        index: Vec<String>,
        pivot_column: String,
        value_column: String,
        reducer: Reducer,
    },

    /// Wide to long.
    Unpivot {
        input: String,
        index: Vec<String>,
        value_columns: Vec<String>,
        key_name: String,
        value_name: String,
    },

    /// Window rank.
    Rank {
        input: String,
        #[serde(default)]
        partition_by: Vec<String>,
        order_by: Vec<String>,
        #[serde(default)]
        descending: bool,
        output: String,
    },

    /// Window running total.
    CumulativeSum {
        input: String,
        #[serde(default)]
        partition_by: Vec<String>,
        order_by: Vec<String>,
        #[serde(default)]
        descending: bool,
        source: String,
        output: String,
    },

    /// Upper-cased string column.
    Upper {
        input: String,
        source: String,
        output: String,
    },

    /// Value categorization.
    Categorize {
        input: String,
        source: String,
        output: String,
        categories: IndexMap<String, Vec<String>>,
        fallback: String,
    },

    /// Largest rows by a column.
    TopN {
        input: String,
        column: String,
        n: usize,
    },
}

impl Step {
    /// Names of the datasets this step reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Step::Join { left, right, .. } => vec![left.as_str(), right.as_str()],
            Step::Aggregate { input, .. }
            | Step::Pivot { input, .. }
            | Step::Unpivot { input, .. }
            | Step::Rank { input, .. }
            | Step::CumulativeSum { input, .. }
            | Step::Upper { input, .. }
            | Step::Categorize { input, .. }
            | Step::TopN { input, .. } => vec![input.as_str()],
        }
    }

    /// Get a human-readable description of the step.
    pub fn description(&self) -> String {
        match self {
            Step::Join {
                left,
                right,
                on,
                right_on,
                kind,
            } => {
                let keys = if right_on.is_empty() {
                    on.join(", ")
                } else {
                    format!("{} = {}", on.join(", "), right_on.join(", "))
                };
                format!("{:?} join '{}' with '{}' on {}", kind, left, right, keys)
            }
            Step::Aggregate {
                input,
                group_by,
                metrics,
            } => {
                let metrics: Vec<String> = metrics
                    .iter()
                    .map(|(name, m)| match &m.column {
                        Some(column) => format!("{}={}({})", name, m.reducer.label(), column),
                        None => format!("{}={}(*)", name, m.reducer.label()),
                    })
                    .collect();
                format!("Aggregate '{}' by [{}]: {}", input, group_by.join(", "), metrics.join(", "))
            }
            Step::Pivot {
                input,
                pivot_column,
                value_column,
                reducer,
                ..
            } => format!(
                "Pivot '{}' on '{}' with {}('{}')",
                input,
                pivot_column,
                reducer.label(),
                value_column
            ),
            Step::Unpivot {
                input,
                value_columns,
                ..
            } => format!("Unpivot {} columns of '{}'", value_columns.len(), input),
            Step::Rank {
                input,
                order_by,
                output,
                ..
            } => format!("Rank '{}' by [{}] into '{}'", input, order_by.join(", "), output),
            Step::CumulativeSum {
                input,
                source,
                output,
                ..
            } => format!("Running total of '{}' in '{}' into '{}'", source, input, output),
            Step::Upper {
                input,
                source,
                output,
            } => format!("Upper-case '{}' in '{}' into '{}'", source, input, output),
            Step::Categorize {
                input,
                source,
                output,
                categories,
                ..
            } => format!(
                "Categorize '{}' in '{}' into '{}' ({} categories)",
                source,
                input,
                output,
                categories.len()
            ),
            Step::TopN { input, column, n } => format!("Top {} of '{}' by '{}'", n, input, column),
        }
    }

    /// Run the step against already available datasets.
    pub fn apply(&self, available: &IndexMap<String, Dataset>) -> Result<Dataset> {
        fn get<'a>(available: &'a IndexMap<String, Dataset>, name: &str) -> Result<&'a Dataset> {
            available
                .get(name)
                .ok_or_else(|| PodiumError::NotFound(format!("input dataset '{}'", name)))
        }

        match self {
            Step::Join {
                left,
                right,
                on,
                right_on,
                kind,
            } => {
                let right_keys = if right_on.is_empty() { on } else { right_on };
                if right_keys.len() != on.len() {
                    return Err(PodiumError::Config(format!(
                        "join of '{}' and '{}' has {} left keys but {} right keys",
                        left,
                        right,
                        on.len(),
                        right_keys.len()
                    )));
                }
                let pairs: Vec<(&str, &str)> = on
                    .iter()
                    .zip(right_keys)
                    .map(|(l, r)| (l.as_str(), r.as_str()))
                    .collect();
                join_on(get(available, left)?, get(available, right)?, &pairs, *kind)
            }
            Step::Aggregate {
                input,
                group_by,
                metrics,
            } => aggregate(get(available, input)?, group_by.as_slice(), metrics),
            Step::Pivot {
                input,
                index,
                pivot_column,
                value_column,
                reducer,
            } => pivot(get(available, input)?, index.as_slice(), pivot_column, value_column, *reducer),
            Step::Unpivot {
                input,
                index,
                value_columns,
                key_name,
                value_name,
            } => unpivot(get(available, input)?, index.as_slice(), value_columns.as_slice(), key_name, value_name),
            Step::Rank {
                input,
                partition_by,
                order_by,
                descending,
                output,
            } => {
                let spec = WindowSpec {
                    partition_by,
                    order_by,
                    descending: *descending,
                };
                rank(get(available, input)?, &spec, output)
            }
            Step::CumulativeSum {
                input,
                partition_by,
                order_by,
                descending,
                source,
                output,
            } => {
                let spec = WindowSpec {
                    partition_by,
                    order_by,
                    descending: *descending,
                };
                cumulative_sum(get(available, input)?, &spec, source, output)
            }
            Step::Upper {
                input,
                source,
                output,
            } => upper(get(available, input)?, source, output),
            Step::Categorize {
                input,
                source,
                output,
                categories,
                fallback,
            } => categorize(get(available, input)?, source, output, categories, fallback),
            Step::TopN { input, column, n } => top_n(get(available, input)?, column, *n),
        }
    }
}
