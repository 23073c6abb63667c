//! Pipeline runs: ids, lifecycle, ledger and the write context.

mod context;
mod id;
mod ledger;
mod state;

pub use context::RunContext;
pub use id::RunId;
pub use ledger::{RunEvent, RunRecord};
pub use state::RunState;
