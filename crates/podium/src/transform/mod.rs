//! Pure transformations over datasets and the derivation engine.

mod aggregate;
mod derive;
mod engine;
mod join;
mod operations;
mod reshape;
mod window;

pub use aggregate::{aggregate, Metric, Reducer};
pub use derive::{categorize, upper, with_column};
pub use engine::TransformEngine;
pub use join::{join, join_on, JoinKind};
pub use operations::{Derivation, Step};
pub use reshape::{pivot, unpivot};
pub use window::{cumulative_sum, rank, top_n, WindowSpec};
