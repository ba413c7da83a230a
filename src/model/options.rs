//! Update options and results

use serde_json::Value;

use crate::storage::UpdateOutcome;

/// Options for `Model::update_one`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document when nothing matches
    pub upsert: bool,
    /// On upsert-insert, materialize schema defaults for untouched fields
    pub set_defaults_on_insert: bool,
}

impl UpdateOptions {
    /// Upsert without defaults
    pub fn upsert() -> Self {
        Self {
            upsert: true,
            set_defaults_on_insert: false,
        }
    }

    /// Builder: apply schema defaults when an upsert inserts
    pub fn with_defaults_on_insert(mut self) -> Self {
        self.set_defaults_on_insert = true;
        self
    }
}

/// Result of `Model::update_one`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    /// Documents matching the filter
    pub matched: u64,
    /// Documents changed
    pub modified: u64,
    /// `_id` of the document inserted by an upsert
    pub upserted_id: Option<Value>,
}

impl From<UpdateOutcome> for UpdateResult {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            matched: outcome.matched,
            modified: outcome.modified,
            upserted_id: outcome.upserted_id,
        }
    }
}
