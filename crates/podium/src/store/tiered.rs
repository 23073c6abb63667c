//! Run-scoped, append-only tiered storage on top of a byte backend.
//!
//! Layout:
//!
//! ```text
//! raw/{kind}/{run_id}/part-00000.csv        verbatim text table
//! raw/{kind}/{run_id}/_source.json          source provenance
//! cleansed/{name}/{run_id}/part-00000.json  typed dataset
//! confirmed/{name}/{run_id}/part-00000.json typed, certified dataset
//! _runs/{run_id}/{seq}-{state}.json         run ledger
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::backend::{LocalBackend, MemoryBackend, StorageBackend};
use super::tier::Tier;
use crate::clean::{fingerprint, Certified};
use crate::dataset::Dataset;
use crate::error::{PodiumError, Result};
use crate::input::{Parser, RawTable, SourceMetadata};
use crate::run::{RunEvent, RunId, RunRecord};

const PART: &str = "part-00000";
const SOURCE_FILE: &str = "_source.json";
const RUNS_PREFIX: &str = "_runs";

static NAME_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid regex"));

/// Dataset names become one path segment of the layout above.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if NAME_SEGMENT.is_match(name) {
        Ok(())
    } else {
        Err(PodiumError::Config(format!(
            "'{}' is not a valid dataset name (letters, digits, '_' and '-' only)",
            name
        )))
    }
}

/// Shared handle to the tiered store. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct TieredStore {
    backend: Arc<dyn StorageBackend>,
}

impl TieredStore {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// A store rooted at a local directory.
    pub fn local(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(Arc::new(LocalBackend::new(root)?)))
    }

    /// The underlying backend.
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    fn part_key(tier: Tier, name: &str, run: &RunId) -> Result<String> {
        check_name(name)?;
        let extension = if tier == Tier::Raw { "csv" } else { "json" };
        Ok(format!("{}/{}/{}/{}.{}", tier, name, run, PART, extension))
    }

    /// Write the verbatim text table of one source and its provenance.
    pub(crate) fn write_raw(
        &self,
        run: &RunId,
        kind: &str,
        raw: &RawTable,
        source: &SourceMetadata,
    ) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer.write_record(&raw.headers)?;
        for row in &raw.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;

        self.backend.put_new(&Self::part_key(Tier::Raw, kind, run)?, &bytes)?;
        self.backend.put_new(
            &format!("{}/{}/{}/{}", Tier::Raw, kind, run, SOURCE_FILE),
            &serde_json::to_vec_pretty(source)?,
        )
    }

    /// Write a typed dataset to the cleansed tier.
    ///
    /// The raw tier only takes text tables and the confirmed tier only
    /// certified datasets.
    pub(crate) fn write(&self, tier: Tier, run: &RunId, dataset: &Dataset) -> Result<()> {
        match tier {
            Tier::Raw => Err(PodiumError::Config(format!(
                "Dataset '{}' is typed; the raw tier only holds source text",
                dataset.name
            ))),
            Tier::Confirmed => Err(PodiumError::Uncertified(dataset.name.clone())),
            Tier::Cleansed => {
                dataset.validate()?;
                self.put_dataset(tier, run, dataset)
            }
        }
    }

    /// Write a certified dataset to the confirmed tier.
    ///
    /// The dataset is re-hashed and refused if it no longer matches its
    /// certificate.
    pub(crate) fn write_certified(&self, run: &RunId, certified: &Certified) -> Result<()> {
        let dataset = certified.dataset();
        if fingerprint(dataset)? != certified.fingerprint() {
            return Err(PodiumError::Uncertified(dataset.name.clone()));
        }
        self.put_dataset(Tier::Confirmed, run, dataset)
    }

    fn put_dataset(&self, tier: Tier, run: &RunId, dataset: &Dataset) -> Result<()> {
        let bytes = serde_json::to_vec(dataset)?;
        self.backend
            .put_new(&Self::part_key(tier, &dataset.name, run)?, &bytes)
    }

    /// Run ids holding `name` in `tier`, oldest first.
    pub fn runs_with(&self, tier: Tier, name: &str) -> Result<Vec<RunId>> {
        check_name(name)?;
        let prefix = format!("{}/{}/", tier, name);
        let mut runs: Vec<RunId> = Vec::new();
        for key in self.backend.list(&prefix)? {
            let Some(run) = key[prefix.len()..].split('/').next() else {
                continue;
            };
            let run: RunId = run.parse()?;
            if runs.last() != Some(&run) {
                runs.push(run);
            }
        }
        Ok(runs)
    }

    fn resolve_run(&self, tier: Tier, name: &str, run: Option<&RunId>) -> Result<RunId> {
        match run {
            Some(run) => Ok(run.clone()),
            None => self
                .runs_with(tier, name)?
                .pop()
                .ok_or_else(|| PodiumError::NotFound(format!("{}/{}", tier, name))),
        }
    }

    /// Read the text table and provenance of a raw source. `None` reads
    /// the latest run holding it.
    pub fn read_raw(&self, kind: &str, run: Option<&RunId>) -> Result<(RawTable, SourceMetadata)> {
        let run = self.resolve_run(Tier::Raw, kind, run)?;
        let bytes = self.backend.get(&Self::part_key(Tier::Raw, kind, &run)?)?;
        let table = Parser::new().parse_bytes(&bytes, b',')?;
        let source = self
            .backend
            .get(&format!("{}/{}/{}/{}", Tier::Raw, kind, run, SOURCE_FILE))?;
        Ok((table, serde_json::from_slice(&source)?))
    }

    /// Read a typed dataset. `None` reads the latest run holding it.
    pub fn read(&self, tier: Tier, name: &str, run: Option<&RunId>) -> Result<Dataset> {
        if tier == Tier::Raw {
            return Err(PodiumError::Config(
                "The raw tier holds source text; use read_raw".to_string(),
            ));
        }
        let run = self.resolve_run(tier, name, run)?;
        let bytes = self.backend.get(&Self::part_key(tier, name, &run)?)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Names of the datasets one run wrote to a tier, sorted.
    pub fn datasets(&self, tier: Tier, run: &RunId) -> Result<Vec<String>> {
        let prefix = format!("{}/", tier);
        let mut names: Vec<String> = self
            .backend
            .list(&prefix)?
            .iter()
            .filter_map(|key| {
                let mut parts = key[prefix.len()..].split('/');
                let (name, key_run, file) = (parts.next()?, parts.next()?, parts.next()?);
                (key_run == run.as_str() && file.starts_with(PART)).then(|| name.to_string())
            })
            .collect();
        names.dedup();
        Ok(names)
    }

    /// Append one event to a run's ledger.
    pub(crate) fn append_event(&self, event: &RunEvent) -> Result<()> {
        let key = format!(
            "{}/{}/{:03}-{}.json",
            RUNS_PREFIX, event.run_id, event.seq, event.state
        );
        self.backend.put_new(&key, &serde_json::to_vec_pretty(event)?)
    }

    /// Every recorded event of one run, in order.
    pub fn run_history(&self, run: &RunId) -> Result<Vec<RunEvent>> {
        let keys = self.backend.list(&format!("{}/{}/", RUNS_PREFIX, run))?;
        if keys.is_empty() {
            return Err(PodiumError::NotFound(format!("run {}", run)));
        }
        keys.iter()
            .map(|key| -> Result<RunEvent> { Ok(serde_json::from_slice(&self.backend.get(key)?)?) })
            .collect()
    }

    /// Latest known state of every run, oldest first.
    pub fn runs(&self) -> Result<Vec<RunRecord>> {
        let prefix = format!("{}/", RUNS_PREFIX);
        let mut events: BTreeMap<RunId, Vec<RunEvent>> = BTreeMap::new();
        for key in self.backend.list(&prefix)? {
            let event: RunEvent = serde_json::from_slice(&self.backend.get(&key)?)?;
            events.entry(event.run_id.clone()).or_default().push(event);
        }
        Ok(events
            .values()
            .filter_map(|history| RunRecord::from_events(history))
            .collect())
    }

    /// The most recent run that reached `Confirmed`.
    pub fn latest_confirmed_run(&self) -> Result<Option<RunId>> {
        Ok(self
            .runs()?
            .into_iter()
            .filter(|record| record.state.is_confirmed())
            .map(|record| record.run_id)
            .max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::certify;
    use crate::dataset::Value;
    use crate::error::ErrorKind;
    use crate::run::RunState;
    use crate::schema::{Column, Schema, ValueType};

    fn medals() -> Dataset {
        Dataset::from_rows(
            "medals",
            Schema::with_columns(vec![
                Column::required("country", ValueType::String),
                Column::new("gold", ValueType::Integer),
                Column::new("share", ValueType::Float),
            ]),
            vec![
                vec!["USA".into(), Value::Integer(39), Value::Float(0.1)],
                vec!["CHN".into(), Value::Null, Value::Float(1.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cleansed_round_trip_and_duplicate() {
        let store = TieredStore::in_memory();
        let run = RunId::generate();
        store.write(Tier::Cleansed, &run, &medals()).unwrap();

        let back = store.read(Tier::Cleansed, "medals", Some(&run)).unwrap();
        assert_eq!(back, medals());
        assert_eq!(store.read(Tier::Cleansed, "medals", None).unwrap(), medals());

        let err = store.write(Tier::Cleansed, &run, &medals()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateWrite);
        assert_eq!(store.datasets(Tier::Cleansed, &run).unwrap(), vec!["medals"]);
    }

    #[test]
    fn test_confirmed_requires_certificate() {
        let store = TieredStore::in_memory();
        let run = RunId::generate();
        let err = store.write(Tier::Confirmed, &run, &medals()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Uncertified);

        store.write_certified(&run, &certify(medals()).unwrap()).unwrap();
        assert_eq!(store.read(Tier::Confirmed, "medals", Some(&run)).unwrap(), medals());
    }

    #[test]
    fn test_names_with_separators_rejected() {
        let store = TieredStore::in_memory();
        for name in ["medals/2021", "..", "", "_runs"] {
            let err = store.read(Tier::Confirmed, name, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "name {:?}", name);
        }
    }

    #[test]
    fn test_read_missing() {
        let store = TieredStore::in_memory();
        let err = store.read(Tier::Confirmed, "medals", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_raw_round_trip() {
        let store = TieredStore::in_memory();
        let run = RunId::generate();
        let raw = RawTable::new(
            vec!["Team".to_string(), "Gold".to_string()],
            vec![
                vec!["USA".to_string(), "39".to_string()],
                vec!["Côte d'Ivoire, Rep.".to_string()],
            ],
            b';',
        );
        let source = SourceMetadata::new(
            PathBuf::from("Medals.csv"),
            "sha256:00".to_string(),
            10,
            "csv-semicolon".to_string(),
            2,
            2,
        );
        store.write_raw(&run, "medals", &raw, &source).unwrap();

        let (back, back_source) = store.read_raw("medals", None).unwrap();
        assert_eq!(back.headers, raw.headers);
        assert_eq!(back.rows, raw.rows);
        assert_eq!(back_source, source);
    }

    #[test]
    fn test_ledger() {
        let store = TieredStore::in_memory();
        let run = RunId::generate();
        assert_eq!(store.latest_confirmed_run().unwrap(), None);

        let states = [
            RunState::Started,
            RunState::Ingesting,
            RunState::Cleaning,
            RunState::Transforming,
            RunState::Confirmed,
        ];
        for (seq, state) in states.into_iter().enumerate() {
            store.append_event(&RunEvent::new(run.clone(), seq as u32, state)).unwrap();
        }

        assert_eq!(store.run_history(&run).unwrap().len(), 5);
        let records = store.runs().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, RunState::Confirmed);
        assert_eq!(store.latest_confirmed_run().unwrap(), Some(run));
    }
}
