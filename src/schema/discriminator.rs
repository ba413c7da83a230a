//! Discriminator variants
//!
//! A base schema owns a closed set of variants keyed by tag. Each variant
//! is merged once, at compile time, into an effective schema holding the
//! base fields, the discriminator key (defaulting to the tag) and the
//! variant's own fields. Instances pick their variant once, from the tag
//! in the incoming or stored data.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::types::{join_path, FieldDef, FieldType, Schema};
use crate::observability::Event;

/// Builds the merged schema of every declared variant.
pub(crate) fn merge_variants(
    base: &Schema,
    prefix: &str,
) -> SchemaResult<IndexMap<String, Arc<Schema>>> {
    let mut merged = IndexMap::with_capacity(base.discriminators.len());

    for (tag, declaration) in &base.discriminators {
        if tag.is_empty() {
            return Err(SchemaError::invalid(
                join_path(prefix, &base.discriminator_key),
                "discriminator tags must be non-empty",
            ));
        }
        if declaration.has_discriminators() {
            return Err(SchemaError::invalid(
                join_path(prefix, tag),
                "discriminator variants cannot declare their own variants",
            ));
        }

        let mut fields = base.fields.clone();
        let mut key_def = base
            .fields
            .get(&base.discriminator_key)
            .cloned()
            .unwrap_or_else(FieldDef::string);
        key_def.field_type = FieldType::String;
        fields.insert(
            base.discriminator_key.clone(),
            key_def.default_value(Value::String(tag.clone())),
        );

        let compiled = declaration.clone().compile_at(prefix)?;
        for (name, def) in &compiled.fields {
            if fields.contains_key(name) {
                return Err(SchemaError::invalid(
                    join_path(prefix, name),
                    format!("variant '{}' redeclares a base field", tag),
                ));
            }
            fields.insert(name.clone(), def.clone());
        }

        merged.insert(
            tag.clone(),
            Arc::new(Schema {
                schema_id: base.schema_id.clone(),
                schema_version: base.schema_version.clone(),
                description: declaration
                    .description
                    .clone()
                    .or_else(|| base.description.clone()),
                fields,
                strict: base.strict,
                discriminator_key: base.discriminator_key.clone(),
                discriminators: IndexMap::new(),
                variant: Some(tag.clone()),
                variants: IndexMap::new(),
            }),
        );
    }

    Ok(merged)
}

/// Picks the effective schema for raw input.
///
/// Absent tags resolve to the base schema. Unknown tags also resolve to
/// the base schema and are logged.
pub fn resolve(schema: &Arc<Schema>, raw: &Value) -> Arc<Schema> {
    if !schema.has_discriminators() {
        return Arc::clone(schema);
    }

    let tag = match raw.get(&schema.discriminator_key).and_then(Value::as_str) {
        Some(tag) => tag,
        None => return Arc::clone(schema),
    };

    match schema.variant_schema(tag) {
        Some(variant) => {
            tracing::trace!(
                event = %Event::VariantResolved,
                schema = %schema.schema_id,
                variant = tag,
                "resolved discriminator variant"
            );
            Arc::clone(variant)
        }
        None => {
            tracing::warn!(
                event = %Event::VariantResolved,
                schema = %schema.schema_id,
                variant = tag,
                "unknown discriminator tag, using base schema"
            );
            Arc::clone(schema)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_schema() -> Schema {
        Schema::new("events", "v1", IndexMap::new())
            .field("name", FieldDef::string())
            .with_discriminator(
                "Clicked",
                Schema::inline(IndexMap::new()).field("element", FieldDef::string()),
            )
            .with_discriminator(
                "Purchased",
                Schema::inline(IndexMap::new())
                    .field("prices", FieldDef::map_of(FieldDef::number())),
            )
    }

    #[test]
    fn test_variants_merge_base_fields_and_key() {
        let schema = event_schema().compile().unwrap();
        let purchased = schema.variant_schema("Purchased").unwrap();

        let names: Vec<&str> = purchased.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["name", "__t", "prices"]);
        assert_eq!(purchased.variant(), Some("Purchased"));
        assert!(purchased.fields["prices"].map_value().is_some());
    }

    #[test]
    fn test_resolve_by_tag() {
        let schema = event_schema().compile().unwrap();

        let resolved = resolve(&schema, &json!({"__t": "Clicked"}));
        assert_eq!(resolved.variant(), Some("Clicked"));

        let resolved = resolve(&schema, &json!({"name": "x"}));
        assert_eq!(resolved.variant(), None);

        let resolved = resolve(&schema, &json!({"__t": "Nope"}));
        assert_eq!(resolved.variant(), None);
    }

    #[test]
    fn test_variant_cannot_redeclare_base_field() {
        let schema = Schema::new("events", "v1", IndexMap::new())
            .field("name", FieldDef::string())
            .with_discriminator(
                "Bad",
                Schema::inline(IndexMap::new()).field("name", FieldDef::number()),
            );
        let err = schema.compile().unwrap_err();
        assert_eq!(err.path(), Some("name"));
    }

    #[test]
    fn test_lookup_field_searches_variants() {
        let schema = event_schema().compile().unwrap();
        assert!(schema.lookup_field("prices").is_some());
        assert!(schema.lookup_field("element").is_some());
        assert!(schema.lookup_field("missing").is_none());
    }
}
