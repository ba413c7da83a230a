//! In-memory storage client
//!
//! Collections are ordered lists of JSON documents behind a single
//! `RwLock`. Each operation holds the lock for its whole duration, so
//! operations are atomic with respect to each other.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::apply::{apply_update, same_document, seed_from_filter};
use super::client::{StorageClient, UpdateOutcome};
use super::errors::{StoreError, StoreResult};
use super::filters::{values_equal, PredicateFilter};
use crate::query::{Filter, Update};

type Collections = HashMap<String, Vec<Value>>;

/// Storage client keeping every collection in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        Ok(self.read()?.get(collection).map_or(0, Vec::len))
    }

    /// Snapshot of a collection in insertion order
    pub fn documents(&self, collection: &str) -> StoreResult<Vec<Value>> {
        Ok(self.read()?.get(collection).cloned().unwrap_or_default())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.collections.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.collections.write().map_err(|_| StoreError::LockPoisoned)
    }
}

fn check_insertable(collection: &str, existing: &[Value], document: &Value) -> StoreResult<()> {
    if !document.is_object() {
        return Err(StoreError::InvalidDocument {
            reason: "document must be an object".to_string(),
        });
    }
    if let Some(id) = document.get("_id") {
        if existing
            .iter()
            .any(|stored| stored.get("_id").map_or(false, |other| values_equal(other, id)))
        {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                id: id.clone(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl StorageClient for MemoryStore {
    async fn insert_one(&self, collection: &str, document: Value) -> StoreResult<()> {
        let mut collections = self.write()?;
        let documents = collections.entry(collection.to_string()).or_default();
        check_insertable(collection, documents, &document)?;
        documents.push(document);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> StoreResult<()> {
        let mut collections = self.write()?;
        let stored = collections.entry(collection.to_string()).or_default();

        let mut staged: Vec<Value> = Vec::with_capacity(documents.len());
        for document in documents {
            check_insertable(collection, stored, &document)?;
            check_insertable(collection, &staged, &document)?;
            staged.push(document);
        }
        stored.extend(staged);
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| PredicateFilter::matches(document, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome> {
        let mut collections = self.write()?;
        let documents = collections.entry(collection.to_string()).or_default();

        let position = documents
            .iter()
            .position(|document| PredicateFilter::matches(document, filter));

        if let Some(index) = position {
            let mut updated = documents[index].clone();
            apply_update(&mut updated, update, false)?;
            let modified = !same_document(&documents[index], &updated);
            if modified {
                documents[index] = updated;
            }
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(modified),
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome::default());
        }

        let mut inserted = seed_from_filter(filter)?;
        apply_update(&mut inserted, update, true)?;
        if inserted.get("_id").is_none() {
            if let Value::Object(object) = &mut inserted {
                object.shift_insert(0, "_id".to_string(), Value::String(Uuid::new_v4().to_string()));
            }
        }
        check_insertable(collection, documents, &inserted)?;
        let upserted_id = inserted.get("_id").cloned();
        documents.push(inserted);

        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new();
        store.insert_one("c", json!({"_id": 1, "v": {"x": 1}})).await.unwrap();
        store.insert_one("c", json!({"_id": 2, "v": {"x": 2}})).await.unwrap();

        let found = store
            .find("c", &Filter::new().filter_eq("v.x", json!(2)))
            .await
            .unwrap();
        assert_eq!(found, vec![json!({"_id": 2, "v": {"x": 2}})]);
        assert_eq!(store.count("missing").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryStore::new();
        store.insert_one("c", json!({"_id": 1})).await.unwrap();
        let err = store.insert_one("c", json!({"_id": 1.0})).await.unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_insert_many_is_all_or_nothing() {
        let store = MemoryStore::new();
        let err = store
            .insert_many("c", vec![json!({"_id": 1}), json!({"_id": 1})])
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(store.count("c").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_document_unchanged() {
        let store = MemoryStore::new();
        store.insert_one("c", json!({"_id": 1, "n": "x", "v": {"a": 1}})).await.unwrap();

        let update = Update {
            set: [("v.a".to_string(), json!(2))].into_iter().collect(),
            inc: [("n".to_string(), json!(1))].into_iter().collect(),
            ..Update::default()
        };
        assert!(store
            .update_one("c", &Filter::by_id(json!(1)), &update, false)
            .await
            .is_err());
        assert_eq!(
            store.documents("c").unwrap(),
            vec![json!({"_id": 1, "n": "x", "v": {"a": 1}})]
        );
    }

    #[tokio::test]
    async fn test_update_counts() {
        let store = MemoryStore::new();
        store.insert_one("c", json!({"_id": 1, "v": {"a": 1}})).await.unwrap();

        let same = Update::new().with_set("v.a", json!(1.0));
        let outcome = store.update_one("c", &Filter::by_id(json!(1)), &same, false).await.unwrap();
        assert_eq!((outcome.matched, outcome.modified), (1, 0));

        let miss = store
            .update_one("c", &Filter::by_id(json!(9)), &same, false)
            .await
            .unwrap();
        assert_eq!(miss, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn test_upsert_seeds_from_filter() {
        let store = MemoryStore::new();
        let update = Update {
            set: [("v.a".to_string(), json!(1))].into_iter().collect(),
            set_on_insert: [("d".to_string(), json!({"x": 1}))].into_iter().collect(),
            ..Update::default()
        };
        let outcome = store
            .update_one("c", &Filter::new().filter_eq("name", json!("n")), &update, true)
            .await
            .unwrap();
        let id = outcome.upserted_id.unwrap();

        let stored = store.documents("c").unwrap().remove(0);
        assert_eq!(stored["_id"], id);
        assert_eq!(stored["name"], json!("n"));
        assert_eq!(stored["v"], json!({"a": 1}));
        assert_eq!(stored["d"], json!({"x": 1}));
    }
}
