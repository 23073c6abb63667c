//! Input parsing and typed ingestion.

mod loader;
mod parser;
mod source;

pub use loader::{LoadOutcome, Loader, LoaderConfig, RowError};
pub use parser::{Parser, ParserConfig};
pub use source::{RawTable, SourceMetadata};
