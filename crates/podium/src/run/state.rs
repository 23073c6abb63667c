//! Run lifecycle.

use serde::{Deserialize, Serialize};

use crate::store::Tier;

/// State of a pipeline run.
///
/// `Started -> Ingesting -> Cleaning -> Transforming -> Confirmed`, with
/// `Failed` reachable from any non-terminal state. Terminal states are
/// never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Started,
    Ingesting,
    Cleaning,
    Transforming,
    Confirmed,
    Failed,
}

impl RunState {
    /// Whether the run is closed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Confirmed | RunState::Failed)
    }

    /// Whether the run completed and its confirmed data is queryable.
    pub fn is_confirmed(&self) -> bool {
        *self == RunState::Confirmed
    }

    /// The stage after this one on the success path.
    pub fn next(&self) -> Option<RunState> {
        match self {
            RunState::Started => Some(RunState::Ingesting),
            RunState::Ingesting => Some(RunState::Cleaning),
            RunState::Cleaning => Some(RunState::Transforming),
            RunState::Transforming => Some(RunState::Confirmed),
            RunState::Confirmed | RunState::Failed => None,
        }
    }

    /// Whether moving to `to` is legal.
    pub fn can_transition_to(&self, to: RunState) -> bool {
        match to {
            RunState::Failed => !self.is_terminal(),
            _ => self.next() == Some(to),
        }
    }

    /// The only tier a run in this state may write to.
    pub fn writable_tier(&self) -> Option<Tier> {
        match self {
            RunState::Ingesting => Some(Tier::Raw),
            RunState::Cleaning => Some(Tier::Cleansed),
            RunState::Transforming => Some(Tier::Confirmed),
            _ => None,
        }
    }

    /// Snake-case name used in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Started => "started",
            RunState::Ingesting => "ingesting",
            RunState::Cleaning => "cleaning",
            RunState::Transforming => "transforming",
            RunState::Confirmed => "confirmed",
            RunState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_path() {
        let mut state = RunState::Started;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            assert!(state.can_transition_to(next));
            state = next;
            visited.push(state);
        }
        assert_eq!(visited.len(), 5);
        assert_eq!(state, RunState::Confirmed);
    }

    #[test]
    fn test_no_skips_or_reopening() {
        assert!(!RunState::Started.can_transition_to(RunState::Cleaning));
        assert!(!RunState::Ingesting.can_transition_to(RunState::Confirmed));
        assert!(!RunState::Confirmed.can_transition_to(RunState::Failed));
        assert!(!RunState::Failed.can_transition_to(RunState::Started));
        assert!(RunState::Cleaning.can_transition_to(RunState::Failed));
    }

    #[test]
    fn test_writable_tiers() {
        assert_eq!(RunState::Ingesting.writable_tier(), Some(Tier::Raw));
        assert_eq!(RunState::Cleaning.writable_tier(), Some(Tier::Cleansed));
        assert_eq!(RunState::Transforming.writable_tier(), Some(Tier::Confirmed));
        assert_eq!(RunState::Started.writable_tier(), None);
        assert_eq!(RunState::Confirmed.writable_tier(), None);
    }
}
