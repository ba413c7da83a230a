//! Query error types
//!
//! Error codes:
//! - AERO_QUERY_INVALID (REJECT)
//! - AERO_QUERY_UNKNOWN_OPERATOR (REJECT)
//! - AERO_CAST_FAILED (REJECT), wrapping the leaf `CastError`

use std::fmt;

use crate::cast::CastError;

/// Query-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Malformed filter or update structure
    AeroQueryInvalid,
    /// Operator not supported
    AeroQueryUnknownOperator,
    /// Leaf value does not cast to the declared type
    AeroCastFailed,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::AeroQueryInvalid => "AERO_QUERY_INVALID",
            QueryErrorCode::AeroQueryUnknownOperator => "AERO_QUERY_UNKNOWN_OPERATOR",
            QueryErrorCode::AeroCastFailed => crate::cast::CAST_FAILED,
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error type with full context
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
    /// Dotted path the error refers to, if any
    path: Option<String>,
    cast: Option<CastError>,
}

impl QueryError {
    /// Create a malformed query error
    pub fn invalid(path: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::AeroQueryInvalid,
            message: reason.into(),
            path: path.map(str::to_string),
            cast: None,
        }
    }

    /// Create an unknown operator error
    pub fn unknown_operator(path: Option<&str>, op: &str) -> Self {
        Self {
            code: QueryErrorCode::AeroQueryUnknownOperator,
            message: format!("Unknown operator '{}'", op),
            path: path.map(str::to_string),
            cast: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the dotted path, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the underlying cast failure, if this is one
    pub fn cast_error(&self) -> Option<&CastError> {
        self.cast.as_ref()
    }
}

impl From<CastError> for QueryError {
    fn from(err: CastError) -> Self {
        Self {
            code: QueryErrorCode::AeroCastFailed,
            message: err.to_string(),
            path: Some(err.path().to_string()),
            cast: Some(err),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cast) = &self.cast {
            return write!(f, "{}", cast);
        }
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)?;
        if let Some(path) = &self.path {
            write!(f, " at path \"{}\"", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryError {}

/// Result type for query resolution
pub type QueryResult<T> = Result<T, QueryError>;
