//! Default materialization
//!
//! Defaults are cast through the field's declared type exactly like
//! input values, so a map default becomes a `DocMap` whose entries keep
//! the enumeration order of the default object.

use serde_json::Value;

use super::value::FieldValue;
use crate::cast::{cast_field, CastResult};
use crate::observability::Event;
use crate::schema::{FieldDef, Schema};

/// Builds the default value of a field, if it declares one.
pub fn materialize(def: &FieldDef, path: &str) -> CastResult<Option<FieldValue>> {
    let default = match &def.default {
        Some(default) => default,
        None => return Ok(None),
    };
    let value = cast_field(def, path, &default.produce())?;
    tracing::trace!(event = %Event::DefaultsApplied, path, "default materialized");
    Ok(Some(value))
}

/// Persisted defaults for an upsert-insert.
///
/// Returns `(field, value)` for every top-level field with a default that
/// is not covered by `touched`. A field is covered when a touched path
/// equals it or lies below it.
pub fn defaults_on_insert(schema: &Schema, touched: &[&str]) -> CastResult<Vec<(String, Value)>> {
    let mut out = Vec::new();
    for (name, def) in &schema.fields {
        let covered = touched
            .iter()
            .any(|path| path.split('.').next() == Some(name.as_str()));
        if covered {
            continue;
        }
        if let Some(value) = materialize(def, name)? {
            out.push((name.clone(), value.to_json()));
        }
    }
    if !out.is_empty() {
        tracing::debug!(
            event = %Event::DefaultsApplied,
            schema = %schema.schema_id,
            fields = out.len(),
            "defaults applied on upsert insert"
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new("test", "v1", IndexMap::new())
            .field(
                "m",
                FieldDef::map_of(FieldDef::number()).default_value(json!({"b": 2, "a": 1, "c": "3"})),
            )
            .field(
                "computed",
                FieldDef::map_of(FieldDef::string()).default_with(|| json!({"z": "last", "y": "first"})),
            )
            .field("plain", FieldDef::number())
    }

    #[test]
    fn test_static_map_default_keeps_order_and_casts() {
        let schema = schema();
        let value = materialize(&schema.fields["m"], "m").unwrap().unwrap();
        let map = value.as_map().unwrap();
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(map.get("c"), Some(&FieldValue::Number(3.0)));
    }

    #[test]
    fn test_computed_default() {
        let schema = schema();
        let value = materialize(&schema.fields["computed"], "computed").unwrap().unwrap();
        assert_eq!(value.to_json(), json!({"z": "last", "y": "first"}));
    }

    #[test]
    fn test_no_default() {
        let schema = schema();
        assert!(materialize(&schema.fields["plain"], "plain").unwrap().is_none());
    }

    #[test]
    fn test_bad_default_is_a_cast_error() {
        let def = FieldDef::map_of(FieldDef::number()).default_value(json!({"x": "nope"}));
        let err = materialize(&def, "m").unwrap_err();
        assert_eq!(err.path(), "m.x");
    }

    #[test]
    fn test_defaults_on_insert_skip_touched_fields() {
        let schema = schema();
        let defaults = defaults_on_insert(&schema, &["m.b"]).unwrap();
        let names: Vec<&str> = defaults.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["computed"]);
    }
}
