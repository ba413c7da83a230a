//! Schema error types
//!
//! Error codes:
//! - AERO_SCHEMA_INVALID (REJECT)
//! - AERO_UNKNOWN_SCHEMA (REJECT)
//! - AERO_SCHEMA_IMMUTABLE (REJECT)
//! - AERO_UNKNOWN_VARIANT (REJECT)
//! - AERO_SCHEMA_LOAD_FAILED (FATAL)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller request rejected
    Reject,
    /// Startup cannot continue (loader errors)
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema declaration is structurally invalid
    AeroSchemaInvalid,
    /// Schema ID not found
    AeroUnknownSchema,
    /// Attempt to re-register an existing schema version
    AeroSchemaImmutable,
    /// Discriminator variant not declared on the schema
    AeroUnknownVariant,
    /// Schema file missing or malformed on disk (FATAL)
    AeroSchemaLoadFailed,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::AeroSchemaInvalid => "AERO_SCHEMA_INVALID",
            SchemaErrorCode::AeroUnknownSchema => "AERO_UNKNOWN_SCHEMA",
            SchemaErrorCode::AeroSchemaImmutable => "AERO_SCHEMA_IMMUTABLE",
            SchemaErrorCode::AeroUnknownVariant => "AERO_UNKNOWN_VARIANT",
            SchemaErrorCode::AeroSchemaLoadFailed => "AERO_SCHEMA_LOAD_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::AeroSchemaLoadFailed => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Field path the error refers to, if any
    path: Option<String>,
}

impl SchemaError {
    /// Create an invalid declaration error for a field path
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            code: SchemaErrorCode::AeroSchemaInvalid,
            message: format!("Invalid declaration at '{}': {}", path, reason.into()),
            path: Some(path),
        }
    }

    /// Create an unknown schema error
    pub fn unknown_schema(schema_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::AeroUnknownSchema,
            message: format!(
                "Schema '{}' version '{}' not found",
                schema_id.into(),
                version.into()
            ),
            path: None,
        }
    }

    /// Create a schema immutable error
    pub fn schema_immutable(schema_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::AeroSchemaImmutable,
            message: format!(
                "Schema '{}' version '{}' is immutable",
                schema_id.into(),
                version.into()
            ),
            path: None,
        }
    }

    /// Create an unknown discriminator variant error
    pub fn unknown_variant(schema_id: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::AeroUnknownVariant,
            message: format!(
                "Schema '{}' declares no discriminator '{}'",
                schema_id.into(),
                variant.into()
            ),
            path: None,
        }
    }

    /// Create an error for a schema file that cannot be loaded
    pub fn load_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::AeroSchemaLoadFailed,
            message: format!("Cannot load schema file '{}': {}", path.into(), reason.into()),
            path: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending field path, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::AeroSchemaInvalid.code(), "AERO_SCHEMA_INVALID");
        assert_eq!(SchemaErrorCode::AeroUnknownSchema.code(), "AERO_UNKNOWN_SCHEMA");
        assert_eq!(SchemaErrorCode::AeroSchemaImmutable.code(), "AERO_SCHEMA_IMMUTABLE");
        assert_eq!(SchemaErrorCode::AeroUnknownVariant.code(), "AERO_UNKNOWN_VARIANT");
        assert_eq!(SchemaErrorCode::AeroSchemaLoadFailed.code(), "AERO_SCHEMA_LOAD_FAILED");
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(SchemaErrorCode::AeroSchemaInvalid.severity(), Severity::Reject);
        assert_eq!(SchemaErrorCode::AeroSchemaLoadFailed.severity(), Severity::Fatal);
    }

    #[test]
    fn test_invalid_carries_path() {
        let err = SchemaError::invalid("v.$*", "regex does not compile");
        assert_eq!(err.path(), Some("v.$*"));
        let display = format!("{}", err);
        assert!(display.contains("REJECT"));
        assert!(display.contains("AERO_SCHEMA_INVALID"));
        assert!(display.contains("v.$*"));
    }
}
