//! Cast error type
//!
//! Error code: AERO_CAST_FAILED (REJECT)

use std::fmt;

use serde_json::Value;

/// Error code string for cast failures
pub const CAST_FAILED: &str = "AERO_CAST_FAILED";

/// A value could not be converted to its declared type.
///
/// `path` is always the full dotted path of the offending value
/// (`v.notA`, `employees.1.apiKeys.github`), never its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct CastError {
    path: String,
    kind: String,
    value: Value,
    reason: Option<String>,
}

impl CastError {
    /// Create a cast error for a value that does not convert to `kind`
    pub fn new(path: impl Into<String>, kind: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
            value,
            reason: None,
        }
    }

    /// Attaches a reason to the error
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> &'static str {
        CAST_FAILED
    }

    /// Returns the dotted path of the offending value
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the declared type name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the offending raw value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the reason, if any
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[REJECT] {}: Cast to {} failed for value {} at path \"{}\"",
            CAST_FAILED, self.kind, self.value, self.path
        )?;
        if let Some(reason) = &self.reason {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for CastError {}

/// Result type for cast operations
pub type CastResult<T> = Result<T, CastError>;
