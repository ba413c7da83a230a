//! Collection models
//!
//! A `Model` binds a compiled schema to a collection in a storage client.
//! It casts and validates documents before they are written and resolves
//! filters and updates against the schema before they reach storage.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use super::options::{UpdateOptions, UpdateResult};
use crate::cast::CastError;
use crate::config::OdmConfig;
use crate::document::{defaults, Document};
use crate::error::{OdmError, OdmResult};
use crate::observability::Event;
use crate::query::{Filter, PathResolver, Update};
use crate::schema::{FieldDef, Schema, SchemaError, SchemaResult};
use crate::storage::StorageClient;
use crate::validation::ValidationEngine;

/// Applies configuration to a schema declaration and compiles it.
///
/// Adds a generated UUID `_id` as the first field when `auto_id` is set
/// and the schema declares none, and applies the `strict` override.
pub fn compile_schema(mut schema: Schema, config: &OdmConfig) -> SchemaResult<Arc<Schema>> {
    if config.auto_id && !schema.fields.contains_key("_id") {
        let id = FieldDef::uuid().default_with(|| Value::String(Uuid::new_v4().to_string()));
        schema.fields.shift_insert(0, "_id".to_string(), id);
    }
    schema.strict = config.strict_for(&schema);
    schema.compile()
}

/// A schema bound to a collection.
///
/// Models created through `discriminator` share the collection and store
/// but construct documents of one variant and only see that variant.
pub struct Model<S: StorageClient> {
    collection: String,
    /// Schema documents are built from: the base schema, or a variant
    schema: Arc<Schema>,
    store: Arc<S>,
    config: OdmConfig,
    /// Pinned discriminator tag for variant models
    variant: Option<String>,
    engine: ValidationEngine,
}

impl<S: StorageClient> Model<S> {
    /// Creates a model with the default configuration.
    pub fn new(collection: impl Into<String>, schema: Schema, store: Arc<S>) -> OdmResult<Self> {
        Self::with_config(collection, schema, store, OdmConfig::default())
    }

    /// Creates a model with explicit configuration.
    pub fn with_config(
        collection: impl Into<String>,
        schema: Schema,
        store: Arc<S>,
        config: OdmConfig,
    ) -> OdmResult<Self> {
        let schema = compile_schema(schema, &config)?;
        Ok(Self {
            collection: collection.into(),
            schema,
            store,
            config,
            variant: None,
            engine: ValidationEngine::new(),
        })
    }

    /// Returns a model over the same collection for one discriminator
    /// variant. Its queries only match documents of that variant and its
    /// new documents carry the variant tag.
    pub fn discriminator(&self, tag: &str) -> OdmResult<Model<S>> {
        let variant = self
            .schema
            .variant_schema(tag)
            .cloned()
            .ok_or_else(|| SchemaError::unknown_variant(&self.schema.schema_id, tag))?;

        Ok(Model {
            collection: self.collection.clone(),
            schema: variant,
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            variant: Some(tag.to_string()),
            engine: self.engine,
        })
    }

    /// Returns the schema documents of this model are built from
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the pinned discriminator tag of a variant model
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Constructs an unsaved document.
    pub fn new_document(&self, input: &Value) -> OdmResult<Document> {
        let result = match (&self.variant, input) {
            (Some(tag), Value::Object(fields)) => {
                let mut fields = fields.clone();
                fields.insert(
                    self.schema.discriminator_key.clone(),
                    Value::String(tag.clone()),
                );
                Document::new(&self.schema, &Value::Object(fields))
            }
            _ => Document::new(&self.schema, input),
        };
        result.map_err(|err| self.cast_failed(err))
    }

    /// Rebuilds a document from its stored form.
    pub fn hydrate(&self, raw: &Value) -> OdmResult<Document> {
        Document::hydrate(&self.schema, raw).map_err(|err| self.cast_failed(err))
    }

    /// Constructs, validates and inserts a document.
    pub async fn create(&self, input: &Value) -> OdmResult<Document> {
        let mut document = self.new_document(input)?;
        self.save(&mut document).await?;
        Ok(document)
    }

    /// Inserts several documents. Every document is cast and validated
    /// before anything is written.
    pub async fn insert_many(&self, inputs: &[Value]) -> OdmResult<Vec<Document>> {
        let mut documents = inputs
            .iter()
            .map(|input| self.new_document(input))
            .collect::<OdmResult<Vec<_>>>()?;
        for document in &documents {
            self.engine.validate(document)?;
        }

        let stored = documents.iter().map(Document::to_object).collect();
        self.store.insert_many(&self.collection, stored).await?;

        for document in &mut documents {
            document.mark_persisted();
        }
        tracing::info!(
            event = %Event::DocumentSaved,
            collection = %self.collection,
            count = documents.len(),
            "documents inserted"
        );
        Ok(documents)
    }

    /// Validates and persists a document.
    ///
    /// New documents are inserted whole. Persisted documents write only
    /// the paths changed since the last save; deleted map entries are
    /// unset. On any failure the document keeps its in-memory state and
    /// its change tracking, so the caller can correct it and retry.
    pub async fn save(&self, document: &mut Document) -> OdmResult<()> {
        self.engine.validate(document)?;

        if document.is_new() {
            self.store
                .insert_one(&self.collection, document.to_object())
                .await?;
            document.mark_persisted();
            tracing::info!(
                event = %Event::DocumentSaved,
                collection = %self.collection,
                id = %document.id().map(|id| id.to_json()).unwrap_or(serde_json::Value::Null),
                "document inserted"
            );
            return Ok(());
        }

        let delta = document.delta();
        if delta.is_empty() {
            return Ok(());
        }

        let id = document
            .id()
            .map(|id| id.to_json())
            .filter(|id| !id.is_null())
            .ok_or(OdmError::MissingId)?;

        let mut update = Update::new();
        for (path, value) in delta {
            match value {
                Some(value) => {
                    update.set.insert(path, value);
                }
                None => update.unset.push(path),
            }
        }

        let filter = self.scoped(Filter::by_id(id.clone()));
        let outcome = self
            .store
            .update_one(&self.collection, &filter, &update, false)
            .await?;
        if outcome.matched == 0 {
            return Err(OdmError::NotFound(id));
        }

        document.mark_persisted();
        tracing::info!(
            event = %Event::DocumentSaved,
            collection = %self.collection,
            id = %id,
            update = %update.to_json(),
            "document changes persisted"
        );
        Ok(())
    }

    /// Finds every matching document.
    ///
    /// The filter accepts dotted paths and nested-object shorthand; leaf
    /// values are cast before the query runs.
    pub async fn find(&self, filter: &Value) -> OdmResult<Vec<Document>> {
        let filter = self.resolve_filter(filter)?;
        let raw = self.store.find(&self.collection, &filter).await?;
        raw.iter().map(|doc| self.hydrate(doc)).collect()
    }

    /// Finds the first matching document.
    pub async fn find_one(&self, filter: &Value) -> OdmResult<Option<Document>> {
        let filter = self.resolve_filter(filter)?;
        let raw = self.store.find_one(&self.collection, &filter).await?;
        raw.as_ref().map(|doc| self.hydrate(doc)).transpose()
    }

    /// Finds a document by `_id`.
    pub async fn find_by_id(&self, id: impl Into<Value>) -> OdmResult<Option<Document>> {
        self.find_one(&json!({ "_id": id.into() })).await
    }

    /// Updates the first matching document.
    ///
    /// Filter and update are resolved completely before storage is
    /// touched, so a value that fails to cast rejects the whole update.
    pub async fn update_one(
        &self,
        filter: &Value,
        update: &Value,
        options: UpdateOptions,
    ) -> OdmResult<UpdateResult> {
        let (filter, mut update) = match self.resolve_update(filter, update) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(
                    event = %Event::UpdateRejected,
                    collection = %self.collection,
                    error = %err,
                    "update rejected before reaching storage"
                );
                return Err(err);
            }
        };

        if options.upsert {
            if let Some(tag) = &self.variant {
                update
                    .set_on_insert
                    .entry(self.schema.discriminator_key.clone())
                    .or_insert_with(|| Value::String(tag.clone()));
            }
            if options.set_defaults_on_insert {
                self.add_insert_defaults(&filter, &mut update)?;
            }
        }

        let outcome = self
            .store
            .update_one(&self.collection, &filter, &update, options.upsert)
            .await?;
        tracing::info!(
            event = %Event::UpdateApplied,
            collection = %self.collection,
            matched = outcome.matched,
            modified = outcome.modified,
            upserted = outcome.upserted_id.is_some(),
            "update applied"
        );
        Ok(outcome.into())
    }

    fn resolve_filter(&self, raw: &Value) -> OdmResult<Filter> {
        let filter = PathResolver::new(&self.schema).resolve_filter(raw)?;
        Ok(self.scoped(filter))
    }

    fn resolve_update(&self, filter: &Value, update: &Value) -> OdmResult<(Filter, Update)> {
        let filter = self.resolve_filter(filter)?;
        let update = PathResolver::new(&self.schema).resolve_update(update)?;
        Ok((filter, update))
    }

    /// `$setOnInsert` for every defaulted field the update and the
    /// filter's equality predicates leave untouched.
    fn add_insert_defaults(&self, filter: &Filter, update: &mut Update) -> OdmResult<()> {
        let defaults = {
            let mut touched = update.touched_paths();
            touched.extend(update.set_on_insert.keys().map(String::as_str));
            touched.extend(filter.equality_seeds().into_iter().map(|(path, _)| path));
            defaults::defaults_on_insert(&self.schema, &touched)?
        };
        for (field, value) in defaults {
            update.set_on_insert.insert(field, value);
        }
        Ok(())
    }

    /// Pins variant models to their discriminator tag.
    fn scoped(&self, filter: Filter) -> Filter {
        match &self.variant {
            Some(tag) => filter.filter_eq(
                self.schema.discriminator_key.clone(),
                Value::String(tag.clone()),
            ),
            None => filter,
        }
    }

    fn cast_failed(&self, err: CastError) -> OdmError {
        tracing::debug!(
            event = %Event::CastFailed,
            collection = %self.collection,
            path = err.path(),
            kind = err.kind(),
            "cast failed"
        );
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use indexmap::IndexMap;

    fn schema() -> Schema {
        Schema::new("things", "v1", IndexMap::new())
            .field("v", FieldDef::map_of(FieldDef::number()))
            .with_discriminator(
                "Special",
                Schema::inline(IndexMap::new()).field("extra", FieldDef::string()),
            )
    }

    #[test]
    fn test_compile_schema_adds_id_first() {
        let compiled = compile_schema(schema(), &OdmConfig::default()).unwrap();
        let names: Vec<&String> = compiled.fields.keys().collect();
        assert_eq!(names, vec!["_id", "v"]);

        let config = OdmConfig {
            auto_id: false,
            strict: Some(false),
            ..OdmConfig::default()
        };
        let compiled = compile_schema(schema(), &config).unwrap();
        assert!(!compiled.fields.contains_key("_id"));
        assert!(!compiled.strict);
    }

    #[tokio::test]
    async fn test_unknown_variant() {
        let model = Model::new("things", schema(), Arc::new(MemoryStore::new())).unwrap();
        assert!(matches!(
            model.discriminator("Nope"),
            Err(OdmError::Schema(_))
        ));
        assert_eq!(model.discriminator("Special").unwrap().variant(), Some("Special"));
    }

    #[tokio::test]
    async fn test_save_without_changes_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let model = Model::new("things", schema(), Arc::clone(&store)).unwrap();
        let mut doc = model.create(&json!({"v": {"a": 1}})).await.unwrap();
        model.save(&mut doc).await.unwrap();
        assert_eq!(store.count("things").unwrap(), 1);
    }
}
