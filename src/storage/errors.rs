//! Storage client errors

use serde_json::Value;
use thiserror::Error;

/// Errors raised by a storage client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document with the same `_id` already exists in the collection.
    #[error("[REJECT] AERO_DUPLICATE_KEY: duplicate _id {id} in collection '{collection}'")]
    DuplicateKey { collection: String, id: Value },

    /// Stored documents must be JSON objects.
    #[error("[REJECT] AERO_STORAGE_INVALID_DOCUMENT: {reason}")]
    InvalidDocument { reason: String },

    /// An update operation cannot be applied to the stored document.
    #[error("[REJECT] AERO_STORAGE_WRITE_FAILED: cannot apply update at path \"{path}\": {reason}")]
    InvalidUpdate { path: String, reason: String },

    /// A previous writer panicked while holding the store lock.
    #[error("[FATAL] AERO_STORAGE_LOCK_POISONED: store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub(crate) fn invalid_update(path: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidUpdate {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error is a duplicate `_id`
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
