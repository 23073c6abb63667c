//! Podium: a local, tiered ETL core for Olympics tabular data.
//!
//! Raw delimited files are ingested, cleaned and transformed by a single
//! [`Pipeline`] run, which lands its output in three storage tiers:
//!
//! - **raw**: source text exactly as ingested, plus provenance
//! - **cleansed**: deduplicated, filled, schema-validated datasets
//! - **confirmed**: certified datasets and their derivations
//!
//! Every write is append-only and scoped to the run id, so runs never
//! overwrite each other and may execute concurrently. Queries only see
//! runs that reached `Confirmed`.
//!
//! # Example
//!
//! ```no_run
//! use podium::{Pipeline, PipelineConfig, QueryEngine, TieredStore};
//!
//! let store = TieredStore::local("store").unwrap();
//! let pipeline = Pipeline::new(PipelineConfig::olympics(), store.clone()).unwrap();
//! let summary = pipeline.run("data").unwrap();
//! println!("Run {} confirmed {} datasets", summary.run_id, summary.confirmed.len());
//!
//! let medals = QueryEngine::new(store).medal_counts_by_country().unwrap();
//! println!("{} countries", medals.row_count());
//! ```

pub mod clean;
pub mod config;
pub mod dataset;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod query;
pub mod run;
pub mod schema;
pub mod store;
pub mod transform;

mod olympics;

pub use clean::{certify, Certified, CleaningReport, CleaningRules, FillPolicy};
pub use config::PipelineConfig;
pub use dataset::{Dataset, Row, Value};
pub use error::{ErrorKind, PodiumError, Result, StageFailure};
pub use input::{LoadOutcome, Loader, LoaderConfig, SourceMetadata};
pub use pipeline::{LoadSummary, Pipeline, RunSummary};
pub use query::QueryEngine;
pub use run::{RunContext, RunId, RunRecord, RunState};
pub use schema::{Column, DatasetDefinition, Schema, SchemaRegistry, ValueType};
pub use store::{Tier, TieredStore};
pub use transform::{Derivation, JoinKind, Metric, Reducer, Step};
