//! Validation error types
//!
//! Error code: AERO_VALIDATION_FAILED (REJECT)
//!
//! A `ValidationError` aggregates one `FieldError` per failing validator,
//! each keyed by the dotted path of the value it rejected.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Error code string for validation failures
pub const VALIDATION_FAILED: &str = "AERO_VALIDATION_FAILED";

/// A single failing validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Dotted path of the rejected value (`v.x`, never `v` for entry failures)
    pub path: String,
    /// Validator kind (`required`, `min`, custom name, ...)
    pub validator: String,
    pub message: String,
    /// Rejected value in persisted form
    pub value: Value,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Path `{}` failed validator `{}`: {}",
            self.path, self.validator, self.message
        )
    }
}

/// Aggregate validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub(crate) fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Returns the error code
    pub fn code(&self) -> &'static str {
        VALIDATION_FAILED
    }

    /// All failures in document order
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Distinct failing paths in document order
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for error in &self.errors {
            if !paths.contains(&error.path.as_str()) {
                paths.push(&error.path);
            }
        }
        paths
    }

    /// First failure at `path`
    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.path == path)
    }

    /// Every failure at `path`
    pub fn errors_at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a FieldError> {
        self.errors.iter().filter(move |e| e.path == path)
    }

    /// Returns true if any validator failed at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: ", VALIDATION_FAILED)?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error(path: &str, validator: &str) -> FieldError {
        FieldError {
            path: path.into(),
            validator: validator.into(),
            message: "failed".into(),
            value: json!(1),
        }
    }

    #[test]
    fn test_lookup_by_path() {
        let err = ValidationError::new(vec![
            error("v.x", "min"),
            error("v", "custom"),
            error("v.x", "max"),
        ]);

        assert_eq!(err.len(), 3);
        assert_eq!(err.paths(), vec!["v.x", "v"]);
        assert_eq!(err.errors_at("v.x").count(), 2);
        assert_eq!(err.get("v").unwrap().validator, "custom");
        assert!(!err.contains("v.y"));
    }

    #[test]
    fn test_display() {
        let err = ValidationError::new(vec![error("v.x", "min")]);
        let display = format!("{}", err);
        assert!(display.starts_with("[REJECT] AERO_VALIDATION_FAILED"));
        assert!(display.contains("`v.x`"));
    }
}
