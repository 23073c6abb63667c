//! Pipeline orchestration: one run through every stage.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clean::{certify, Cleaner, CleaningReport};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::{Result, StageFailure};
use crate::input::{Loader, RowError, SourceMetadata};
use crate::run::{RunContext, RunId, RunState};
use crate::schema::SchemaRegistry;
use crate::store::{Tier, TieredStore};
use crate::transform::TransformEngine;

/// What ingestion did with one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Dataset kind.
    pub dataset: String,
    /// Rows that coerced cleanly.
    pub rows: usize,
    /// Rejected rows and cells.
    pub row_errors: Vec<RowError>,
    /// Provenance of the source file.
    pub source: SourceMetadata,
}

/// Result of a confirmed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run id.
    pub run_id: RunId,
    /// One entry per ingested source.
    pub loads: Vec<LoadSummary>,
    /// One report per cleaned dataset.
    pub cleaning: Vec<CleaningReport>,
    /// Confirmed datasets with their row counts, in write order.
    pub confirmed: IndexMap<String, usize>,
}

/// Drives runs of a fixed configuration against a store.
///
/// A pipeline is immutable and can start any number of runs, including
/// concurrently from several threads.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    registry: SchemaRegistry,
    engine: TransformEngine,
    store: TieredStore,
}

impl Pipeline {
    /// Validate the configuration and bind it to a store.
    pub fn new(config: PipelineConfig, store: TieredStore) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: config.registry()?,
            engine: config.engine(),
            config,
            store,
        })
    }

    /// The configuration runs use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The store runs write to.
    pub fn store(&self) -> &TieredStore {
        &self.store
    }

    /// Run every configured dataset, reading each source file from
    /// `input_dir`.
    pub fn run(&self, input_dir: impl AsRef<Path>) -> std::result::Result<RunSummary, StageFailure> {
        let input_dir = input_dir.as_ref();
        let sources: Vec<(String, PathBuf)> = self
            .registry
            .definitions()
            .map(|d| (d.kind.clone(), input_dir.join(&d.source)))
            .collect();
        self.run_sources(&sources)
    }

    /// Run with explicit (kind, path) sources.
    ///
    /// The run ends `Confirmed` on success. Any error closes it as
    /// `Failed` and is returned as a [`StageFailure`].
    pub fn run_sources(
        &self,
        sources: &[(String, PathBuf)],
    ) -> std::result::Result<RunSummary, StageFailure> {
        let run_id = RunId::generate();
        let mut ctx = RunContext::start(self.store.clone(), run_id.clone())
            .map_err(|e| StageFailure::new(run_id, RunState::Started, &e))?;

        match self.execute(&mut ctx, sources) {
            Ok(summary) => Ok(summary),
            Err(e) => Err(ctx.fail(&e)),
        }
    }

    fn execute(&self, ctx: &mut RunContext, sources: &[(String, PathBuf)]) -> Result<RunSummary> {
        ctx.advance(RunState::Ingesting)?;
        let loader = Loader::new(&self.registry, &self.config.loader)?;
        let mut loads = Vec::with_capacity(sources.len());
        let mut loaded: Vec<Dataset> = Vec::with_capacity(sources.len());
        for (kind, path) in sources {
            let outcome = loader.load(ctx, path, kind)?;
            info!(
                run_id = %ctx.run_id(),
                dataset = %kind,
                rows = outcome.dataset.row_count(),
                rejected = outcome.errors.len(),
                "Ingested source"
            );
            loads.push(LoadSummary {
                dataset: kind.clone(),
                rows: outcome.dataset.row_count(),
                row_errors: outcome.errors,
                source: outcome.source,
            });
            loaded.push(outcome.dataset);
        }

        ctx.advance(RunState::Cleaning)?;
        let cleaner = Cleaner::new(&self.registry);
        let mut cleaning = Vec::with_capacity(loaded.len());
        for dataset in &loaded {
            let (cleansed, report) = cleaner.clean(dataset)?;
            if report.rows_dropped > 0 {
                warn!(
                    run_id = %ctx.run_id(),
                    dataset = %report.dataset,
                    dropped = report.rows_dropped,
                    "Rows dropped during cleaning"
                );
            }
            ctx.write(Tier::Cleansed, &cleansed)?;
            cleaning.push(report);
        }

        ctx.advance(RunState::Transforming)?;
        let mut base = IndexMap::new();
        let mut confirmed = IndexMap::new();
        for dataset in &loaded {
            let cleansed = ctx.read(Tier::Cleansed, &dataset.name)?;
            let certified = certify(cleansed)?;
            ctx.write_certified(&certified)?;
            let cleansed = certified.into_inner();
            confirmed.insert(cleansed.name.clone(), cleansed.row_count());
            base.insert(cleansed.name.clone(), cleansed);
        }
        for derived in self.engine.run(base)? {
            let certified = certify(derived)?;
            ctx.write_certified(&certified)?;
            let derived = certified.dataset();
            confirmed.insert(derived.name.clone(), derived.row_count());
        }

        ctx.advance(RunState::Confirmed)?;
        info!(run_id = %ctx.run_id(), datasets = confirmed.len(), "Run confirmed");

        Ok(RunSummary {
            run_id: ctx.run_id().clone(),
            loads,
            cleaning,
            confirmed,
        })
    }
}
