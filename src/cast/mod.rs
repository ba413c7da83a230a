//! TypedValue casters
//!
//! Converts raw JSON input into values conforming to a declared field
//! type, or fails with a `CastError` naming the full dotted path.

mod caster;
mod errors;

pub use caster::{cast_field, cast_scalar};
pub use errors::{CastError, CastResult, CAST_FAILED};
