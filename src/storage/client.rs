//! Storage client boundary
//!
//! The mapper hands already-cast filters and updates to a `StorageClient`
//! and receives raw JSON documents back for rehydration.

use async_trait::async_trait;
use serde_json::Value;

use super::errors::StoreResult;
use crate::query::{Filter, Update};

/// Outcome of a single-document update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Documents matching the filter (0 or 1)
    pub matched: u64,
    /// Documents whose stored form changed
    pub modified: u64,
    /// `_id` of the inserted document when an upsert inserted
    pub upserted_id: Option<Value>,
}

/// Document storage used by models.
///
/// Implementations must apply each operation atomically per document: a
/// failed update leaves the stored document unchanged.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Inserts a document. Fails if its `_id` already exists.
    async fn insert_one(&self, collection: &str, document: Value) -> StoreResult<()>;

    /// Inserts several documents in order.
    ///
    /// The default inserts one at a time and stops at the first failure,
    /// leaving earlier documents stored. Stores that can insert all or none
    /// override it.
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> StoreResult<()> {
        for document in documents {
            self.insert_one(collection, document).await?;
        }
        Ok(())
    }

    /// Returns every matching document in insertion order.
    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Returns the first matching document.
    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// Updates the first matching document, inserting one when `upsert` is
    /// set and nothing matches.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome>;
}
