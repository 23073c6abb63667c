//! Declared dataset schemas and the registry that holds them.

mod column;
mod naming;
mod registry;
mod table;
mod types;

pub use column::Column;
pub use naming::canonical_name;
pub use registry::{DatasetDefinition, SchemaRegistry};
pub use table::Schema;
pub use types::ValueType;
