//! Casted field values

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};
use uuid::Uuid;

use super::docmap::DocMap;
use super::document::Document;

/// A value that has passed casting into its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Uuid(Uuid),
    /// Verbatim JSON for `mixed` fields
    Mixed(Value),
    Array(Vec<FieldValue>),
    Map(DocMap),
    Document(Box<Document>),
}

impl FieldValue {
    /// Returns true for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&DocMap> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut DocMap> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            FieldValue::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            FieldValue::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<FieldValue>> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Serializes to the persisted JSON form.
    ///
    /// Integral numbers are written as JSON integers, dates as RFC 3339
    /// with millisecond precision, UUIDs hyphenated.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => number_to_json(*n),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Date(d) => Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FieldValue::Uuid(id) => Value::String(id.to_string()),
            FieldValue::Mixed(value) => value.clone(),
            FieldValue::Array(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Map(map) => map.to_object(),
            FieldValue::Document(doc) => doc.to_object(),
        }
    }

    /// Collects modified paths below this value.
    pub(crate) fn collect_modified(&self, out: &mut Vec<String>) {
        match self {
            FieldValue::Map(map) => map.collect_modified(out),
            FieldValue::Document(doc) => doc.collect_modified(out),
            FieldValue::Array(items) => {
                for item in items {
                    item.collect_modified(out);
                }
            }
            _ => {}
        }
    }

    /// Collects persistence operations for in-place changes below this value.
    pub(crate) fn collect_delta(&self, out: &mut Vec<(String, Option<Value>)>) {
        match self {
            FieldValue::Map(map) => map.collect_delta(out),
            FieldValue::Document(doc) => doc.collect_delta(out),
            FieldValue::Array(items) => {
                for item in items {
                    item.collect_delta(out);
                }
            }
            _ => {}
        }
    }

    /// Clears modification tracking below this value.
    pub(crate) fn reset_modified(&mut self) {
        match self {
            FieldValue::Map(map) => map.reset_modified(),
            FieldValue::Document(doc) => doc.reset_modified(),
            FieldValue::Array(items) => items.iter_mut().for_each(FieldValue::reset_modified),
            _ => {}
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
