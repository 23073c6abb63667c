//! Error types for the Podium library.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::run::{RunId, RunState};
use crate::store::Tier;

/// Main error type for Podium operations.
#[derive(Debug, Error)]
pub enum PodiumError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single cell or record could not be parsed.
    #[error("Parse error at row {row}, column '{column}': {message}")]
    Parse {
        row: usize,
        column: String,
        message: String,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File-level header does not match the registered schema.
    #[error("Schema mismatch for '{dataset}': {message}")]
    SchemaMismatch { dataset: String, message: String },

    /// Too many row-level errors during a load.
    #[error("Ingestion of '{dataset}' aborted: {errors} row errors exceed threshold of {threshold}")]
    IngestionAborted {
        dataset: String,
        errors: usize,
        threshold: usize,
    },

    /// Join key columns have different types on each side.
    #[error("Join key '{column}' has type {left} on the left but {right} on the right")]
    JoinKeyMismatch {
        column: String,
        left: String,
        right: String,
    },

    /// A dataset already exists at this (tier, name, run).
    #[error("Duplicate write: '{path}' already exists")]
    DuplicateWrite { path: String },

    /// Requested object is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Dataset kind is not registered.
    #[error("Unknown dataset kind: '{0}'")]
    UnknownDatasetKind(String),

    /// No run has reached the Confirmed state yet.
    #[error("No completed run with confirmed data")]
    NoCompletedRun,

    /// A referenced column does not exist in the dataset.
    #[error("Column '{column}' not found in '{dataset}'")]
    ColumnNotFound { dataset: String, column: String },

    /// A value or column has an unexpected type.
    #[error("Type mismatch in column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// Illegal run state transition.
    #[error("Run {run_id}: cannot move from {from} to {to}")]
    InvalidTransition {
        run_id: RunId,
        from: RunState,
        to: RunState,
    },

    /// A stage tried to write outside the tier it owns.
    #[error("Run {run_id} in state {state} may not write to the {tier} tier")]
    TierViolation {
        run_id: RunId,
        state: RunState,
        tier: Tier,
    },

    /// Confirmed-tier write without a valid certificate.
    #[error("Dataset '{0}' is not certified for the confirmed tier")]
    Uncertified(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Empty file or no data.
    #[error("Empty data: {0}")]
    EmptyData(String),
}

impl PodiumError {
    /// Machine-readable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PodiumError::Io { .. } => ErrorKind::Io,
            PodiumError::Parse { .. } => ErrorKind::ParseError,
            PodiumError::Csv(_) => ErrorKind::ParseError,
            PodiumError::SchemaMismatch { .. } => ErrorKind::SchemaMismatchError,
            PodiumError::IngestionAborted { .. } => ErrorKind::IngestionAborted,
            PodiumError::JoinKeyMismatch { .. } => ErrorKind::JoinKeyMismatch,
            PodiumError::DuplicateWrite { .. } => ErrorKind::DuplicateWrite,
            PodiumError::NotFound(_) => ErrorKind::NotFound,
            PodiumError::UnknownDatasetKind(_) => ErrorKind::UnknownDatasetKind,
            PodiumError::NoCompletedRun => ErrorKind::NoCompletedRun,
            PodiumError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
            PodiumError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            PodiumError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            PodiumError::TierViolation { .. } => ErrorKind::TierViolation,
            PodiumError::Uncertified(_) => ErrorKind::Uncertified,
            PodiumError::Config(_) => ErrorKind::Config,
            PodiumError::Json(_) => ErrorKind::Serialization,
            PodiumError::EmptyData(_) => ErrorKind::EmptyData,
        }
    }

    pub(crate) fn column_not_found(dataset: &str, column: &str) -> Self {
        PodiumError::ColumnNotFound {
            dataset: dataset.to_string(),
            column: column.to_string(),
        }
    }
}

/// Stable, machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ParseError,
    SchemaMismatchError,
    IngestionAborted,
    JoinKeyMismatch,
    DuplicateWrite,
    NotFound,
    UnknownDatasetKind,
    NoCompletedRun,
    ColumnNotFound,
    TypeMismatch,
    InvalidTransition,
    TierViolation,
    Uncertified,
    Config,
    Io,
    Serialization,
    EmptyData,
}

impl ErrorKind {
    /// Snake-case code used in logs and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "parse_error",
            ErrorKind::SchemaMismatchError => "schema_mismatch_error",
            ErrorKind::IngestionAborted => "ingestion_aborted",
            ErrorKind::JoinKeyMismatch => "join_key_mismatch",
            ErrorKind::DuplicateWrite => "duplicate_write",
            ErrorKind::NotFound => "not_found",
            ErrorKind::UnknownDatasetKind => "unknown_dataset_kind",
            ErrorKind::NoCompletedRun => "no_completed_run",
            ErrorKind::ColumnNotFound => "column_not_found",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::TierViolation => "tier_violation",
            ErrorKind::Uncertified => "uncertified",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Serialization => "serialization",
            ErrorKind::EmptyData => "empty_data",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure that moved a run to `Failed`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("run {run_id} failed during {stage} ({kind}): {message}")]
pub struct StageFailure {
    /// Run that failed.
    pub run_id: RunId,
    /// State the run was in when the error occurred.
    pub stage: RunState,
    /// Machine-readable error kind.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl StageFailure {
    pub(crate) fn new(run_id: RunId, stage: RunState, error: &PodiumError) -> Self {
        Self {
            run_id,
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Result type alias for Podium operations.
pub type Result<T> = std::result::Result<T, PodiumError>;
