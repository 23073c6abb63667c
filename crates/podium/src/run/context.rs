//! The handle a run's stages write through.

use tracing::{info, warn};

use super::id::RunId;
use super::ledger::RunEvent;
use super::state::RunState;
use crate::clean::Certified;
use crate::dataset::Dataset;
use crate::error::{PodiumError, Result, StageFailure};
use crate::input::{RawTable, SourceMetadata};
use crate::store::{Tier, TieredStore};

/// One live run: its id, current state and store access.
///
/// Every transition is recorded in the store's ledger before it takes
/// effect, and writes are only accepted for the tier the current state
/// owns.
#[derive(Debug)]
pub struct RunContext {
    store: TieredStore,
    run_id: RunId,
    state: RunState,
    seq: u32,
}

impl RunContext {
    /// Open a run in `Started`.
    pub fn start(store: TieredStore, run_id: RunId) -> Result<Self> {
        store.append_event(&RunEvent::new(run_id.clone(), 0, RunState::Started))?;
        info!(run_id = %run_id, "Run started");
        Ok(Self {
            store,
            run_id,
            state: RunState::Started,
            seq: 0,
        })
    }

    /// Run id.
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The store this run writes to.
    pub fn store(&self) -> &TieredStore {
        &self.store
    }

    /// Move to the next state.
    pub fn advance(&mut self, to: RunState) -> Result<()> {
        if to == RunState::Failed || !self.state.can_transition_to(to) {
            return Err(PodiumError::InvalidTransition {
                run_id: self.run_id.clone(),
                from: self.state,
                to,
            });
        }
        self.record(RunEvent::new(self.run_id.clone(), self.seq + 1, to))?;
        info!(run_id = %self.run_id, state = %to, "Run advanced");
        Ok(())
    }

    /// Close the run as `Failed`, returning the failure to report.
    ///
    /// A run that is already closed keeps its state.
    pub fn fail(&mut self, error: &PodiumError) -> StageFailure {
        let failure = StageFailure::new(self.run_id.clone(), self.state, error);
        if self.state.is_terminal() {
            return failure;
        }
        warn!(
            run_id = %self.run_id,
            stage = %self.state,
            kind = %failure.kind,
            "Run failed: {}",
            failure.message
        );
        let event = RunEvent::new(self.run_id.clone(), self.seq + 1, RunState::Failed)
            .with_failure(failure.clone());
        if let Err(e) = self.record(event) {
            warn!(run_id = %self.run_id, "Could not record failure: {}", e);
            self.state = RunState::Failed;
        }
        failure
    }

    fn record(&mut self, event: RunEvent) -> Result<()> {
        self.store.append_event(&event)?;
        self.seq = event.seq;
        self.state = event.state;
        Ok(())
    }

    fn check_tier(&self, tier: Tier) -> Result<()> {
        if self.state.writable_tier() == Some(tier) {
            Ok(())
        } else {
            Err(PodiumError::TierViolation {
                run_id: self.run_id.clone(),
                state: self.state,
                tier,
            })
        }
    }

    /// Write a source's text table to the raw tier.
    pub fn write_raw(&self, kind: &str, raw: &RawTable, source: &SourceMetadata) -> Result<()> {
        self.check_tier(Tier::Raw)?;
        self.store.write_raw(&self.run_id, kind, raw, source)
    }

    /// Write a typed dataset to the cleansed tier.
    pub fn write(&self, tier: Tier, dataset: &Dataset) -> Result<()> {
        self.check_tier(tier)?;
        self.store.write(tier, &self.run_id, dataset)
    }

    /// Write a certified dataset to the confirmed tier.
    pub fn write_certified(&self, certified: &Certified) -> Result<()> {
        self.check_tier(Tier::Confirmed)?;
        self.store.write_certified(&self.run_id, certified)
    }

    /// Read one of this run's own datasets.
    pub fn read(&self, tier: Tier, name: &str) -> Result<Dataset> {
        self.store.read(tier, name, Some(&self.run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::certify;
    use crate::dataset::Value;
    use crate::error::ErrorKind;
    use crate::schema::{Column, Schema, ValueType};

    fn dataset() -> Dataset {
        Dataset::from_rows(
            "medals",
            Schema::with_columns(vec![Column::required("gold", ValueType::Integer)]),
            vec![vec![Value::Integer(1)]],
        )
        .unwrap()
    }

    #[test]
    fn test_tier_ownership() {
        let store = TieredStore::in_memory();
        let mut ctx = RunContext::start(store, RunId::generate()).unwrap();

        let err = ctx.write(Tier::Cleansed, &dataset()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TierViolation);

        ctx.advance(RunState::Ingesting).unwrap();
        ctx.advance(RunState::Cleaning).unwrap();
        ctx.write(Tier::Cleansed, &dataset()).unwrap();
        assert_eq!(ctx.read(Tier::Cleansed, "medals").unwrap(), dataset());

        let certified = certify(dataset()).unwrap();
        assert_eq!(ctx.write_certified(&certified).unwrap_err().kind(), ErrorKind::TierViolation);

        ctx.advance(RunState::Transforming).unwrap();
        ctx.write_certified(&certified).unwrap();
        ctx.advance(RunState::Confirmed).unwrap();

        assert_eq!(ctx.store().run_history(ctx.run_id()).unwrap().len(), 5);
    }

    #[test]
    fn test_invalid_transition() {
        let mut ctx = RunContext::start(TieredStore::in_memory(), RunId::generate()).unwrap();
        let err = ctx.advance(RunState::Cleaning).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(ctx.state(), RunState::Started);

        let err = ctx.advance(RunState::Failed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_fail_records_failure_once() {
        let store = TieredStore::in_memory();
        let mut ctx = RunContext::start(store.clone(), RunId::generate()).unwrap();
        ctx.advance(RunState::Ingesting).unwrap();

        let failure = ctx.fail(&PodiumError::NotFound("Medals.csv".to_string()));
        assert_eq!(failure.stage, RunState::Ingesting);
        assert_eq!(failure.kind, ErrorKind::NotFound);
        assert_eq!(ctx.state(), RunState::Failed);

        ctx.fail(&PodiumError::NoCompletedRun);
        let history = store.run_history(ctx.run_id()).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].failure.as_ref(), Some(&failure));
        assert_eq!(store.latest_confirmed_run().unwrap(), None);
    }
}
