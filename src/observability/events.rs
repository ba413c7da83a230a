//! Observability events for aerodoc
//!
//! Events are explicit and typed. Every log line emitted by the crate
//! carries one of these as its `event` field.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schema lifecycle
    /// Schema files loaded from disk
    SchemasLoaded,
    /// Discriminator tag resolved to a variant schema
    VariantResolved,

    // Documents
    /// Document constructed from input
    DocumentConstructed,
    /// Defaults materialized for absent fields
    DefaultsApplied,
    /// Value failed to cast
    CastFailed,
    /// Document failed validation
    ValidationFailed,
    /// Document inserted or its changes persisted
    DocumentSaved,

    // Queries and updates
    /// Filter or update resolved against the schema
    QueryResolved,
    /// Update reached storage
    UpdateApplied,
    /// Update or update path rejected
    UpdateRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::VariantResolved => "VARIANT_RESOLVED",

            Event::DocumentConstructed => "DOCUMENT_CONSTRUCTED",
            Event::DefaultsApplied => "DEFAULTS_APPLIED",
            Event::CastFailed => "CAST_FAILED",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::DocumentSaved => "DOCUMENT_SAVED",

            Event::QueryResolved => "QUERY_RESOLVED",
            Event::UpdateApplied => "UPDATE_APPLIED",
            Event::UpdateRejected => "UPDATE_REJECTED",
        }
    }

    /// Returns true if this event reports a rejected operation
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Event::CastFailed | Event::ValidationFailed | Event::UpdateRejected
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::SchemasLoaded,
            Event::VariantResolved,
            Event::DocumentConstructed,
            Event::DefaultsApplied,
            Event::CastFailed,
            Event::ValidationFailed,
            Event::DocumentSaved,
            Event::QueryResolved,
            Event::UpdateApplied,
            Event::UpdateRejected,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_rejection_events() {
        assert!(Event::CastFailed.is_rejection());
        assert!(Event::UpdateRejected.is_rejection());
        assert!(!Event::DocumentSaved.is_rejection());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::DocumentSaved), "DOCUMENT_SAVED");
    }
}
