//! Associative field container
//!
//! `DocMap` is the value of a map field: an insertion-ordered string-keyed
//! container whose values have all passed casting into the map's declared
//! value type. Mutations record the touched keys so that `save` can
//! re-persist exactly the changed entries.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use super::value::FieldValue;
use crate::cast::{cast_field, CastError, CastResult};
use crate::schema::{join_path, FieldDef};

/// Map field container with per-entry casting and mutation tracking.
#[derive(Debug, Clone)]
pub struct DocMap {
    /// Dotted path of the map field within its root document
    path: String,
    /// Declaration every value conforms to
    of: Arc<FieldDef>,
    entries: IndexMap<String, FieldValue>,
    /// Keys set or deleted since the last save
    dirty: IndexSet<String>,
}

impl PartialEq for DocMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl DocMap {
    /// Creates an empty map at `path` whose values conform to `of`.
    pub fn new(path: impl Into<String>, of: Arc<FieldDef>) -> Self {
        Self {
            path: path.into(),
            of,
            entries: IndexMap::new(),
            dirty: IndexSet::new(),
        }
    }

    /// Builds a map from raw entries, casting each value.
    ///
    /// Entries keep the enumeration order of `raw`.
    pub fn from_entries(
        path: impl Into<String>,
        of: Arc<FieldDef>,
        raw: &Map<String, Value>,
    ) -> CastResult<Self> {
        let mut map = Self::new(path, of);
        for (key, value) in raw {
            let cast = map.cast_entry(key, value)?;
            map.entries.insert(key.clone(), cast);
        }
        Ok(map)
    }

    /// Returns the dotted path of the map field
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the declaration every value conforms to
    pub fn value_def(&self) -> &FieldDef {
        &self.of
    }

    /// Returns the dotted path of an entry
    pub fn entry_path(&self, key: &str) -> String {
        join_path(&self.path, key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    /// Mutable access for in-place edits of embedded values.
    ///
    /// Changes made through an embedded document are tracked by that
    /// document; replacing a scalar in place is not tracked, use `set`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.entries.get_mut(key)
    }

    /// Casts `raw` through the value type and stores it under `key`.
    ///
    /// An existing key keeps its position. On failure the map is unchanged
    /// and the error names `<field>.<key>`.
    pub fn set(&mut self, key: impl Into<String>, raw: impl Into<Value>) -> CastResult<()> {
        let key = key.into();
        let raw = raw.into();
        let value = self.cast_entry(&key, &raw)?;
        self.entries.insert(key.clone(), value);
        self.dirty.insert(key);
        Ok(())
    }

    /// Removes an entry, returning its value.
    pub fn delete(&mut self, key: &str) -> Option<FieldValue> {
        let removed = self.entries.shift_remove(key);
        if removed.is_some() {
            self.dirty.insert(key.to_string());
        }
        removed
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        let keys: Vec<String> = self.entries.keys().cloned().collect();
        self.dirty.extend(keys);
        self.entries.clear();
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.entries.values()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain representation in insertion order, embedded values recursively.
    pub fn to_object(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Keys set or deleted since the last save
    pub fn modified_keys(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Returns true if an entry was set or deleted, or an embedded value
    /// was changed in place.
    pub fn is_modified(&self) -> bool {
        let mut nested = Vec::new();
        self.collect_modified(&mut nested);
        !nested.is_empty()
    }

    fn cast_entry(&self, key: &str, raw: &Value) -> CastResult<FieldValue> {
        let entry_path = self.entry_path(key);
        if key.is_empty() || key.contains('.') || key.starts_with('$') {
            return Err(CastError::new(entry_path, "Map", Value::String(key.to_string()))
                .with_reason("map keys must be non-empty and contain no '.' or leading '$'"));
        }
        cast_field(&self.of, &entry_path, raw)
    }

    /// Container path first, then each touched entry, then in-place changes.
    pub(crate) fn collect_modified(&self, out: &mut Vec<String>) {
        if !self.dirty.is_empty() {
            out.push(self.path.clone());
            out.extend(self.dirty.iter().map(|key| self.entry_path(key)));
        }
        for (key, value) in &self.entries {
            if !self.dirty.contains(key) {
                value.collect_modified(out);
            }
        }
    }

    /// `Some` sets an entry path, `None` unsets it.
    pub(crate) fn collect_delta(&self, out: &mut Vec<(String, Option<Value>)>) {
        for key in &self.dirty {
            let value = self.entries.get(key).map(FieldValue::to_json);
            out.push((self.entry_path(key), value));
        }
        for (key, value) in &self.entries {
            if !self.dirty.contains(key) {
                value.collect_delta(out);
            }
        }
    }

    pub(crate) fn reset_modified(&mut self) {
        self.dirty.clear();
        self.entries.values_mut().for_each(FieldValue::reset_modified);
    }
}
