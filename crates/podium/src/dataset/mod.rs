//! In-memory typed tables.

mod table;
mod value;

pub use table::{Dataset, Row};
pub use value::Value;
