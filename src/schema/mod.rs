//! Schema subsystem
//!
//! Schemas declare document fields, including map fields whose values
//! conform to a declared type. Declarations are compiled once into an
//! immutable form: embedded schemas are compiled recursively and
//! discriminator variants are merged into effective schemas.
//!
//! # Design Principles
//!
//! - Closed type tag per field, decided at declaration time
//! - Compiled schemas are immutable and shared through `Arc`
//! - Variants form a closed set known at compile time

pub mod discriminator;
mod errors;
mod loader;
mod types;
mod validators;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use loader::SchemaLoader;
pub use types::{
    join_path, DefaultValue, FieldDef, FieldType, PathTarget, ScalarType, Schema,
    DEFAULT_DISCRIMINATOR_KEY,
};
pub use validators::{CustomValidator, Validator, ValidatorFn};
