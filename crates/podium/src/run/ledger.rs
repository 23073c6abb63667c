//! Append-only record of run transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::RunId;
use super::state::RunState;
use crate::error::StageFailure;

/// One state transition of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Run the event belongs to.
    pub run_id: RunId,
    /// Position of the event within the run, starting at 0.
    pub seq: u32,
    /// State entered.
    pub state: RunState,
    /// When the state was entered.
    pub at: DateTime<Utc>,
    /// Why the run failed, on `Failed` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

impl RunEvent {
    /// An event entering `state` now.
    pub fn new(run_id: RunId, seq: u32, state: RunState) -> Self {
        Self {
            run_id,
            seq,
            state,
            at: Utc::now(),
            failure: None,
        }
    }

    /// Attach a failure.
    pub fn with_failure(mut self, failure: StageFailure) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// Summary of a run rebuilt from its ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run id.
    pub run_id: RunId,
    /// Latest state.
    pub state: RunState,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the latest state was entered.
    pub updated_at: DateTime<Utc>,
    /// Failure details for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

impl RunRecord {
    /// Fold a run's events (in ledger order) into its current record.
    pub fn from_events(events: &[RunEvent]) -> Option<Self> {
        let first = events.first()?;
        let last = events.iter().max_by_key(|e| e.seq)?;
        Some(Self {
            run_id: first.run_id.clone(),
            state: last.state,
            started_at: first.at,
            updated_at: last.at,
            failure: last.failure.clone(),
        })
    }
}
