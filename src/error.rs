//! Crate-level error type
//!
//! Subsystem errors keep their own codes and severities; `OdmError` is
//! the boundary type returned by model operations.

use thiserror::Error;

use crate::cast::CastError;
use crate::query::QueryError;
use crate::schema::SchemaError;
use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Errors returned by models and configuration loading.
#[derive(Debug, Error)]
pub enum OdmError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration file unreadable or invalid.
    #[error("[FATAL] AERO_CONFIG_INVALID: {0}")]
    Config(String),

    /// The stored document a save addresses no longer exists.
    #[error("[REJECT] AERO_DOCUMENT_NOT_FOUND: no document with _id {0}")]
    NotFound(serde_json::Value),

    /// A persisted document has no `_id` to address its update by.
    #[error("[REJECT] AERO_DOCUMENT_WITHOUT_ID: persisted document has no _id")]
    MissingId,
}

impl OdmError {
    /// Returns the cast failure, including one raised while resolving a query
    pub fn as_cast(&self) -> Option<&CastError> {
        match self {
            OdmError::Cast(err) => Some(err),
            OdmError::Query(err) => err.cast_error(),
            _ => None,
        }
    }

    /// Returns the validation failure, if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            OdmError::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            OdmError::Schema(err) => err.code().code(),
            OdmError::Cast(err) => err.code(),
            OdmError::Validation(err) => err.code(),
            OdmError::Query(err) => err.code().code(),
            OdmError::Store(_) => "AERO_STORAGE_ERROR",
            OdmError::Config(_) => "AERO_CONFIG_INVALID",
            OdmError::NotFound(_) => "AERO_DOCUMENT_NOT_FOUND",
            OdmError::MissingId => "AERO_DOCUMENT_WITHOUT_ID",
        }
    }
}

/// Result type for model operations
pub type OdmResult<T> = Result<T, OdmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cast_reachable_through_query_error() {
        let cast = CastError::new("v.n", "Number", json!("x"));
        let err: OdmError = QueryError::from(cast.clone()).into();
        assert_eq!(err.as_cast(), Some(&cast));
        assert_eq!(err.code(), "AERO_CAST_FAILED");
    }

    #[test]
    fn test_display_is_transparent() {
        let err: OdmError = CastError::new("v.n", "Number", json!("x")).into();
        assert!(err.to_string().starts_with("[REJECT] AERO_CAST_FAILED"));
    }
}
