//! Read-only queries over the latest confirmed run.

use indexmap::IndexMap;
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{PodiumError, Result};
use crate::run::RunId;
use crate::store::{Tier, TieredStore};
use crate::transform::{aggregate, top_n, unpivot, Metric};

/// Query access to confirmed data.
///
/// Every query resolves the latest `Confirmed` run when it is issued, so
/// runs still in flight (or failed) are never visible.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: TieredStore,
}

impl QueryEngine {
    /// Create a query engine over a store.
    pub fn new(store: TieredStore) -> Self {
        Self { store }
    }

    /// The run queries read from, or `NoCompletedRun`.
    pub fn latest_run(&self) -> Result<RunId> {
        self.store
            .latest_confirmed_run()?
            .ok_or(PodiumError::NoCompletedRun)
    }

    /// Names of the confirmed datasets.
    pub fn datasets(&self) -> Result<Vec<String>> {
        let run = self.latest_run()?;
        self.store.datasets(Tier::Confirmed, &run)
    }

    /// A confirmed dataset as written.
    pub fn dataset(&self, name: &str) -> Result<Dataset> {
        let run = self.latest_run()?;
        debug!(run_id = %run, dataset = name, "Reading confirmed dataset");
        self.store.read(Tier::Confirmed, name, Some(&run))
    }

    /// Row counts per distinct `group_by` combination, in a `count` column.
    pub fn group_count<S: AsRef<str>>(&self, name: &str, group_by: &[S]) -> Result<Dataset> {
        let mut metrics = IndexMap::new();
        metrics.insert("count".to_string(), Metric::count());
        self.summarize(name, group_by, &metrics)
    }

    /// Grouped aggregation of a confirmed dataset.
    pub fn summarize<S: AsRef<str>>(
        &self,
        name: &str,
        group_by: &[S],
        metrics: &IndexMap<String, Metric>,
    ) -> Result<Dataset> {
        aggregate(&self.dataset(name)?, group_by, metrics)
    }

    /// The `n` rows with the largest `column` values.
    pub fn top_n(&self, name: &str, column: &str, n: usize) -> Result<Dataset> {
        top_n(&self.dataset(name)?, column, n)
    }

    /// Gold, silver, bronze and total medals per country.
    pub fn medal_counts_by_country(&self) -> Result<Dataset> {
        let metrics: IndexMap<String, Metric> = ["gold", "silver", "bronze", "total"]
            .into_iter()
            .map(|medal| (medal.to_string(), Metric::sum(medal)))
            .collect();
        Ok(self
            .summarize("medals", &["medal_country"], &metrics)?
            .renamed("medal_counts_by_country"))
    }

    /// Number of athletes per discipline.
    pub fn participants_by_discipline(&self) -> Result<Dataset> {
        Ok(self
            .group_count("athletes", &["discipline"])?
            .renamed("participants_by_discipline"))
    }

    /// Entries per discipline and gender, in long form.
    pub fn entries_by_discipline_and_gender(&self) -> Result<Dataset> {
        let entries = self.dataset("entries_gender")?;
        Ok(unpivot(&entries, &["discipline"], &["female", "male"], "gender", "entries")?
            .renamed("entries_by_discipline_and_gender"))
    }
}
