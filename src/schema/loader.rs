//! Schema loader for reading schema declarations from disk
//!
//! - Schemas stored as `<schema_dir>/schema_<id>_<version>.json`
//! - One file per schema version
//! - Registered schemas are compiled and immutable

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;
use crate::observability::Event;

/// Schema loader that reads schema files from disk and keeps a registry
/// of compiled schemas.
pub struct SchemaLoader {
    /// Directory containing schema files
    schema_dir: PathBuf,
    /// Compiled schemas indexed by (schema_id, schema_version)
    schemas: HashMap<(String, String), Arc<Schema>>,
}

impl SchemaLoader {
    /// Creates a loader for the given schema directory.
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_dir: schema_dir.to_path_buf(),
            schemas: HashMap::new(),
        }
    }

    /// Returns the schema directory path.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads and registers every `.json` file in the schema directory.
    ///
    /// A missing directory is treated as empty.
    pub fn load_all(&mut self) -> SchemaResult<usize> {
        if !self.schema_dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            SchemaError::load_failed(
                self.schema_dir.display().to_string(),
                format!("failed to read schema directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::load_failed(
                    self.schema_dir.display().to_string(),
                    format!("failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        // Directory order is platform dependent.
        paths.sort();

        for path in &paths {
            let schema = Self::load_file(path)?;
            self.insert(schema)?;
        }

        tracing::info!(
            event = %Event::SchemasLoaded,
            dir = %self.schema_dir.display(),
            count = paths.len(),
            "schemas loaded"
        );
        Ok(paths.len())
    }

    /// Reads and compiles a single schema file without registering it.
    pub fn load_file(path: &Path) -> SchemaResult<Arc<Schema>> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::load_failed(path.display().to_string(), format!("failed to read file: {}", e))
        })?;

        let schema: Schema = serde_json::from_str(&content).map_err(|e| {
            SchemaError::load_failed(path.display().to_string(), format!("invalid JSON: {}", e))
        })?;

        schema.compile()
    }

    /// Compiles and registers a schema.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<Arc<Schema>> {
        let compiled = schema.compile()?;
        self.insert(Arc::clone(&compiled))?;
        Ok(compiled)
    }

    fn insert(&mut self, schema: Arc<Schema>) -> SchemaResult<()> {
        let key = (schema.schema_id.clone(), schema.schema_version.clone());
        if self.schemas.contains_key(&key) {
            return Err(SchemaError::schema_immutable(&schema.schema_id, &schema.schema_version));
        }
        self.schemas.insert(key, schema);
        Ok(())
    }

    /// Gets a compiled schema by ID and version.
    pub fn get(&self, schema_id: &str, schema_version: &str) -> SchemaResult<Arc<Schema>> {
        self.schemas
            .get(&(schema_id.to_string(), schema_version.to_string()))
            .cloned()
            .ok_or_else(|| SchemaError::unknown_schema(schema_id, schema_version))
    }

    /// Checks if a schema exists.
    pub fn exists(&self, schema_id: &str, schema_version: &str) -> bool {
        self.get(schema_id, schema_version).is_ok()
    }

    /// Returns the number of registered schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Writes a schema declaration to the schema directory.
    pub fn save_schema(&self, schema: &Schema) -> SchemaResult<PathBuf> {
        let filename = format!("schema_{}_{}.json", schema.schema_id, schema.schema_version);
        let path = self.schema_dir.join(filename);

        if path.exists() {
            return Err(SchemaError::schema_immutable(&schema.schema_id, &schema.schema_version));
        }

        fs::create_dir_all(&self.schema_dir).map_err(|e| {
            SchemaError::load_failed(
                self.schema_dir.display().to_string(),
                format!("failed to create schema directory: {}", e),
            )
        })?;

        let content = serde_json::to_string_pretty(schema).map_err(|e| {
            SchemaError::load_failed(path.display().to_string(), format!("failed to serialize: {}", e))
        })?;

        fs::write(&path, content).map_err(|e| {
            SchemaError::load_failed(path.display().to_string(), format!("failed to write file: {}", e))
        })?;

        Ok(path)
    }
}
