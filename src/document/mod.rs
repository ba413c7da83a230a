//! Documents and map field containers
//!
//! A `Document` holds casted field values; map fields hold a `DocMap`.
//! Both track mutations so that saving persists only what changed.

pub mod defaults;
mod docmap;
#[allow(clippy::module_inception)]
mod document;
mod value;

pub use docmap::DocMap;
pub use document::Document;
pub use value::FieldValue;
