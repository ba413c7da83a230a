//! Validation engine
//!
//! Runs required checks and declared validators over a document before it
//! is persisted, collecting failures keyed by dotted path.

mod engine;
mod errors;

pub use engine::ValidationEngine;
pub use errors::{FieldError, ValidationError, ValidationResult, VALIDATION_FAILED};
