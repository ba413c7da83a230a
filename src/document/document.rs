//! Documents
//!
//! A `Document` is an instance of a (resolved variant) schema. It owns
//! its field values, including `DocMap`s and embedded documents, and
//! records which fields were assigned since the last save.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use super::defaults;
use super::docmap::DocMap;
use super::value::FieldValue;
use crate::cast::{cast_field, CastError, CastResult};
use crate::observability::Event;
use crate::schema::{discriminator, join_path, FieldDef, FieldType, Schema};

/// A root or embedded document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Effective schema, after discriminator resolution
    schema: Arc<Schema>,
    /// Dotted path prefix; empty for root documents
    path: String,
    fields: IndexMap<String, FieldValue>,
    /// Top-level fields assigned or unset since the last save
    modified: IndexSet<String>,
    is_new: bool,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Document {
    /// Constructs a new root document from raw input.
    ///
    /// Resolves the discriminator variant, casts every declared field and
    /// materializes defaults for absent ones.
    pub fn new(schema: &Arc<Schema>, input: &Value) -> CastResult<Self> {
        let doc = Self::build(schema, "", input, true)?;
        tracing::trace!(
            event = %Event::DocumentConstructed,
            schema = %doc.schema.schema_id,
            variant = doc.variant().unwrap_or("-"),
            "document constructed"
        );
        Ok(doc)
    }

    /// Rebuilds a persisted document read from storage.
    ///
    /// Absent fields with defaults are materialized but not marked modified.
    pub fn hydrate(schema: &Arc<Schema>, raw: &Value) -> CastResult<Self> {
        Self::build(schema, "", raw, false)
    }

    /// Constructs an embedded document at `path`.
    pub(crate) fn embedded(schema: &Arc<Schema>, path: &str, raw: &Value) -> CastResult<Self> {
        Self::build(schema, path, raw, true)
    }

    fn build(schema: &Arc<Schema>, path: &str, input: &Value, is_new: bool) -> CastResult<Self> {
        let schema = discriminator::resolve(schema, input);
        let input = match input {
            Value::Object(input) => input,
            other => {
                let at = if path.is_empty() { "$root" } else { path };
                return Err(CastError::new(at, "Document", other.clone()));
            }
        };

        let mut fields = IndexMap::with_capacity(schema.fields.len());

        for (name, def) in &schema.fields {
            let field_path = join_path(path, name);
            match input.get(name) {
                Some(raw) => {
                    fields.insert(name.clone(), cast_field(def, &field_path, raw)?);
                }
                None => {
                    if let Some(value) = defaults::materialize(def, &field_path)? {
                        fields.insert(name.clone(), value);
                    }
                }
            }
        }

        for (name, raw) in input {
            if schema.fields.contains_key(name) {
                continue;
            }
            if schema.strict {
                tracing::trace!(path = %join_path(path, name), "dropping undeclared field");
            } else {
                fields.insert(name.clone(), FieldValue::Mixed(raw.clone()));
            }
        }

        Ok(Self {
            schema,
            path: path.to_string(),
            fields,
            modified: IndexSet::new(),
            is_new,
        })
    }

    /// Returns the effective schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the discriminator tag of the resolved variant
    pub fn variant(&self) -> Option<&str> {
        self.schema.variant()
    }

    /// Returns the dotted path prefix (empty for root documents)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true until the document has been persisted
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Returns the `_id` value, if present
    pub fn id(&self) -> Option<&FieldValue> {
        self.fields.get("_id")
    }

    /// Field names in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Gets a value by field name or dotted path.
    ///
    /// Dotted paths descend through maps, embedded documents and array
    /// indexes (`v.x`, `employees.1.apiKeys.github`).
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                FieldValue::Map(map) => map.get(segment)?,
                FieldValue::Document(doc) => doc.fields.get(segment)?,
                FieldValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Mutable access by field name or dotted path.
    ///
    /// Only changes made through `DocMap` or embedded `Document` methods
    /// are tracked; use `set` to replace values.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut FieldValue> {
        let mut segments = path.split('.');
        let mut current = self.fields.get_mut(segments.next()?)?;
        for segment in segments {
            current = match current {
                FieldValue::Map(map) => map.get_mut(segment)?,
                FieldValue::Document(doc) => doc.fields.get_mut(segment)?,
                FieldValue::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns the map stored at a field name or dotted path
    pub fn map(&self, path: &str) -> Option<&DocMap> {
        self.get(path).and_then(FieldValue::as_map)
    }

    /// Returns the map stored at a field name or dotted path, mutably
    pub fn map_mut(&mut self, path: &str) -> Option<&mut DocMap> {
        self.get_mut(path).and_then(FieldValue::as_map_mut)
    }

    /// Casts and assigns a value at a field name or dotted path.
    ///
    /// Dotted paths through a map set that map's entry (`v.x`). On failure
    /// nothing changes and the error names the full dotted path.
    pub fn set(&mut self, path: &str, raw: impl Into<Value>) -> CastResult<()> {
        let raw = raw.into();
        let (head, rest) = split_first(path);

        let rest = match rest {
            Some(rest) => rest,
            None => return self.assign(head, &raw),
        };

        let full_path = join_path(&self.path, path);
        let field_def = self.schema.fields.get(head).cloned();

        // Assigning an entry of an unset map creates the map.
        let mut replaced = None;
        if let Some(FieldType::Map { of }) = field_def.as_ref().map(|def| &def.field_type) {
            let unset = self.fields.get(head).map_or(true, FieldValue::is_null);
            if unset {
                let map = DocMap::new(join_path(&self.path, head), Arc::clone(of));
                replaced = Some(self.fields.insert(head.to_string(), FieldValue::Map(map)));
            }
        }

        let value = match self.fields.get_mut(head) {
            Some(value) => value,
            None => {
                return Err(CastError::new(full_path, "path", raw)
                    .with_reason("parent value is not set"))
            }
        };

        let element_def = match field_def.as_ref().map(|def| &def.field_type) {
            Some(FieldType::Array { of }) => Some(Arc::clone(of)),
            _ => None,
        };

        let mark_parent = match set_below(value, element_def, &full_path, rest, raw) {
            Ok(mark_parent) => mark_parent || replaced.is_some(),
            Err(err) => {
                match replaced {
                    Some(Some(previous)) => {
                        self.fields.insert(head.to_string(), previous);
                    }
                    Some(None) => {
                        self.fields.shift_remove(head);
                    }
                    None => {}
                }
                return Err(err);
            }
        };
        if mark_parent {
            self.modified.insert(head.to_string());
        }
        Ok(())
    }

    fn assign(&mut self, name: &str, raw: &Value) -> CastResult<()> {
        let field_path = join_path(&self.path, name);
        let value = match self.schema.fields.get(name) {
            Some(def) => cast_field(def, &field_path, raw)?,
            None if !self.schema.strict => FieldValue::Mixed(raw.clone()),
            None => {
                return Err(CastError::new(field_path, "path", raw.clone())
                    .with_reason("path is not declared in a strict schema"))
            }
        };
        self.fields.insert(name.to_string(), value);
        self.modified.insert(name.to_string());
        Ok(())
    }

    /// Removes a top-level field, returning its value.
    pub fn unset(&mut self, name: &str) -> Option<FieldValue> {
        let removed = self.fields.shift_remove(name);
        if removed.is_some() {
            self.modified.insert(name.to_string());
        }
        removed
    }

    /// Marks a top-level field modified so it is rewritten on save
    pub fn mark_modified(&mut self, name: &str) {
        if self.fields.contains_key(name) || self.schema.fields.contains_key(name) {
            self.modified.insert(name.to_string());
        }
    }

    /// Plain representation, fields in schema order
    pub fn to_object(&self) -> Value {
        let object: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(object)
    }

    /// Dotted paths modified since the last save.
    ///
    /// Map mutations report both the map path and the entry path.
    pub fn modified_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_modified(&mut out);
        out
    }

    /// Returns true if `path` was modified since the last save
    pub fn is_modified(&self, path: &str) -> bool {
        self.modified_paths().iter().any(|p| p == path)
    }

    pub(crate) fn collect_modified(&self, out: &mut Vec<String>) {
        for name in &self.modified {
            out.push(join_path(&self.path, name));
        }
        for (name, value) in &self.fields {
            if !self.modified.contains(name) {
                value.collect_modified(out);
            }
        }
    }

    /// Persistence operations for the changes since the last save:
    /// `Some` sets a path, `None` unsets it.
    pub fn delta(&self) -> Vec<(String, Option<Value>)> {
        let mut out = Vec::new();
        self.collect_delta(&mut out);
        out
    }

    pub(crate) fn collect_delta(&self, out: &mut Vec<(String, Option<Value>)>) {
        for name in &self.modified {
            let value = self.fields.get(name).map(FieldValue::to_json);
            out.push((join_path(&self.path, name), value));
        }
        for (name, value) in &self.fields {
            if !self.modified.contains(name) {
                value.collect_delta(out);
            }
        }
    }

    pub(crate) fn reset_modified(&mut self) {
        self.modified.clear();
        self.fields.values_mut().for_each(FieldValue::reset_modified);
    }

    /// Marks the document persisted and clears modification tracking.
    pub(crate) fn mark_persisted(&mut self) {
        self.is_new = false;
        self.reset_modified();
    }
}

fn split_first(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// Assigns `raw` at `rest` below `value`.
///
/// Returns true when the owner must mark its field modified because the
/// change is not tracked by a nested container.
fn set_below(
    value: &mut FieldValue,
    element_def: Option<Arc<FieldDef>>,
    full_path: &str,
    rest: &str,
    raw: Value,
) -> CastResult<bool> {
    let (head, tail) = split_first(rest);
    let not_container = |raw: Value| {
        CastError::new(full_path, "path", raw).with_reason("cannot assign below a non-container value")
    };

    match value {
        FieldValue::Map(map) => match tail {
            None => map.set(head, raw).map(|_| false),
            Some(tail) => {
                let entry_def = match &map.value_def().field_type {
                    FieldType::Array { of } => Some(Arc::clone(of)),
                    _ => None,
                };
                match map.get_mut(head) {
                    Some(entry) => set_below(entry, entry_def, full_path, tail, raw),
                    None => Err(CastError::new(full_path, "path", raw)
                        .with_reason("parent value is not set")),
                }
            }
        },
        FieldValue::Document(doc) => doc.set(rest, raw).map(|_| false),
        FieldValue::Array(items) => {
            let index = match head.parse::<usize>() {
                Ok(index) if index < items.len() => index,
                _ => return Err(not_container(raw)),
            };
            match tail {
                None => {
                    let def = match element_def {
                        Some(def) => def,
                        None => return Err(not_container(raw)),
                    };
                    items[index] = cast_field(&def, full_path, &raw)?;
                    Ok(true)
                }
                Some(tail) => set_below(&mut items[index], None, full_path, tail, raw),
            }
        }
        FieldValue::Mixed(json) => {
            let segments: Vec<&str> = rest.split('.').collect();
            if set_json(json, &segments, &raw) {
                Ok(true)
            } else {
                Err(not_container(raw))
            }
        }
        _ => Err(not_container(raw)),
    }
}

/// Writes `raw` at `segments` inside a mixed value, creating objects on
/// the way. Returns false when a non-object is in the way.
fn set_json(target: &mut Value, segments: &[&str], raw: &Value) -> bool {
    let object = match target {
        Value::Object(object) => object,
        _ => return false,
    };
    match segments {
        [] => false,
        [last] => {
            object.insert(last.to_string(), raw.clone());
            true
        }
        [head, tail @ ..] => {
            let next = object
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_json(next, tail, raw)
        }
    }
}
