//! Validation engine
//!
//! Walks a document against its effective schema and collects every
//! failing validator. Nothing short-circuits: entry-level validators
//! declared on a map's value type and the map field's own validators run
//! independently and are reported together.

use super::errors::{FieldError, ValidationError, ValidationResult};
use crate::document::{Document, FieldValue};
use crate::observability::Event;
use crate::schema::{join_path, FieldDef, FieldType};

/// Stateless document validator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationEngine;

impl ValidationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validates a document, collecting every failure.
    pub fn validate(&self, document: &Document) -> ValidationResult<()> {
        let mut errors = Vec::new();
        validate_document(document, &mut errors);

        if errors.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            event = %Event::ValidationFailed,
            schema = %document.schema().schema_id,
            failures = errors.len(),
            "document failed validation"
        );
        Err(ValidationError::new(errors))
    }
}

fn validate_document(document: &Document, errors: &mut Vec<FieldError>) {
    for (name, def) in &document.schema().fields {
        let path = join_path(document.path(), name);
        validate_value(def, &path, document.get(name), errors);
    }
}

fn validate_value(
    def: &FieldDef,
    path: &str,
    value: Option<&FieldValue>,
    errors: &mut Vec<FieldError>,
) {
    let value = match value {
        Some(value) if !value.is_null() => value,
        _ => {
            if def.required {
                errors.push(FieldError {
                    path: path.to_string(),
                    validator: "required".to_string(),
                    message: format!("Path `{}` is required.", path),
                    value: serde_json::Value::Null,
                });
            }
            return;
        }
    };

    for validator in &def.validators {
        if let Some(message) = validator.check(value) {
            errors.push(FieldError {
                path: path.to_string(),
                validator: validator.kind().to_string(),
                message,
                value: value.to_json(),
            });
        }
    }

    match (&def.field_type, value) {
        (FieldType::Map { of }, FieldValue::Map(map)) => {
            for (key, entry) in map.iter() {
                validate_value(of, &map.entry_path(key), Some(entry), errors);
            }
        }
        (FieldType::Array { of }, FieldValue::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_value(of, &join_path(path, &i.to_string()), Some(item), errors);
            }
        }
        (_, FieldValue::Document(doc)) => validate_document(doc, errors),
        _ => {}
    }
}
