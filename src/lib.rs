//! aerodoc - schema-typed documents with map fields
//!
//! A document mapper core: schemas declare typed fields, including
//! string-keyed maps whose values are cast and validated per entry.
//! Queries and updates address map entries by dotted path and are cast
//! against the schema before they reach storage.
//!
//! Layers, bottom-up:
//! - schema: declarations, validators, discriminators, schema files
//! - cast: raw JSON into declared types
//! - document: documents, map containers, defaults
//! - validation: entry-level and field-level validators
//! - query: filter and update path resolution
//! - storage: the storage client seam and an in-memory store
//! - model: collections tying the layers together

pub mod cast;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod observability;
pub mod query;
pub mod schema;
pub mod storage;
pub mod validation;

pub use config::OdmConfig;
pub use document::{DocMap, Document, FieldValue};
pub use error::{OdmError, OdmResult};
pub use model::{compile_schema, Model, UpdateOptions, UpdateResult};
pub use schema::{FieldDef, FieldType, Schema, Validator};
pub use storage::{MemoryStore, StorageClient};
