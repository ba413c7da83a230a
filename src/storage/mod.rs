//! Storage boundary
//!
//! Models talk to storage only through the `StorageClient` trait, passing
//! filters and updates whose paths and values were already resolved
//! against the schema. `MemoryStore` is the bundled implementation.

mod apply;
mod client;
mod errors;
mod filters;
mod memory;

pub use apply::{apply_update, seed_from_filter};
pub use client::{StorageClient, UpdateOutcome};
pub use errors::{StoreError, StoreResult};
pub use filters::PredicateFilter;
pub use memory::MemoryStore;
