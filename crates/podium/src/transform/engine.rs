//! Engine running an ordered list of derivations.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use super::operations::Derivation;
use crate::dataset::Dataset;
use crate::error::{PodiumError, Result};

/// Applies derivations in order, each able to read the base datasets and
/// every earlier derivation's output.
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    derivations: Vec<Derivation>,
}

impl TransformEngine {
    /// Create a new transform engine.
    pub fn new(derivations: Vec<Derivation>) -> Self {
        Self { derivations }
    }

    /// Get the configured derivations.
    pub fn derivations(&self) -> &[Derivation] {
        &self.derivations
    }

    /// Check that every input resolves to a base dataset or an earlier
    /// derivation and that output names are unique.
    pub fn check<'a>(&self, base: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let mut known: HashSet<&str> = base.into_iter().collect();
        for derivation in &self.derivations {
            for input in derivation.step.inputs() {
                if !known.contains(input) {
                    return Err(PodiumError::Config(format!(
                        "derivation '{}' reads unknown dataset '{}'",
                        derivation.name, input
                    )));
                }
            }
            if !known.insert(derivation.name.as_str()) {
                return Err(PodiumError::Config(format!(
                    "derivation '{}' reuses an existing dataset name",
                    derivation.name
                )));
            }
        }
        Ok(())
    }

    /// Run all derivations, returning their outputs in order.
    pub fn run(&self, base: IndexMap<String, Dataset>) -> Result<Vec<Dataset>> {
        self.check(base.keys().map(String::as_str))?;

        let mut available = base;
        let mut outputs = Vec::with_capacity(self.derivations.len());
        for derivation in &self.derivations {
            debug!(derivation = %derivation.name, step = %derivation.step.description(), "Applying derivation");
            let output = derivation.step.apply(&available)?.renamed(derivation.name.clone());
            available.insert(derivation.name.clone(), output.clone());
            outputs.push(output);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::error::ErrorKind;
    use crate::schema::{Column, Schema, ValueType};
    use crate::transform::{Metric, Step};

    fn medals() -> Dataset {
        Dataset::from_rows(
            "medals",
            Schema::with_columns(vec![
                Column::required("medal_country", ValueType::String),
                Column::required("gold", ValueType::Integer),
            ]),
            vec![
                vec!["USA".into(), Value::Integer(39)],
                vec!["CHN".into(), Value::Integer(38)],
            ],
        )
        .unwrap()
    }

    fn chained() -> Vec<Derivation> {
        let mut metrics = IndexMap::new();
        metrics.insert("total_gold".to_string(), Metric::sum("gold"));
        vec![
            Derivation::new(
                "top_medals",
                Step::TopN {
                    input: "medals".to_string(),
                    column: "gold".to_string(),
                    n: 1,
                },
            ),
            Derivation::new(
                "top_gold",
                Step::Aggregate {
                    input: "top_medals".to_string(),
                    group_by: vec![],
                    metrics,
                },
            ),
        ]
    }

    #[test]
    fn test_chained_derivations() {
        let mut base = IndexMap::new();
        base.insert("medals".to_string(), medals());

        let outputs = TransformEngine::new(chained()).run(base).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].name, "top_medals");
        assert_eq!(outputs[1].name, "top_gold");
        assert_eq!(outputs[1].rows, vec![vec![Value::Integer(39)]]);
    }

    #[test]
    fn test_unknown_input_rejected() {
        let err = TransformEngine::new(chained()).run(IndexMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_duplicate_output_name_rejected() {
        let mut derivations = chained();
        derivations[1].name = "medals".to_string();
        let err = TransformEngine::new(derivations).check(["medals"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
