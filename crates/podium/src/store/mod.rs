//! Tiered, append-only storage.

mod backend;
mod tier;
mod tiered;

pub use backend::{LocalBackend, MemoryBackend, StorageBackend};
pub use tier::Tier;
pub use tiered::TieredStore;
pub(crate) use tiered::check_name;
