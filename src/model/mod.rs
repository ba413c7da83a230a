//! Models
//!
//! A `Model` binds a compiled schema to a collection of a storage client
//! and runs the document lifecycle: construct, validate, persist, query,
//! update.

#[allow(clippy::module_inception)]
mod model;
mod options;

pub use model::{compile_schema, Model};
pub use options::{UpdateOptions, UpdateResult};
