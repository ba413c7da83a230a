//! Path resolution for filters and updates
//!
//! Rewrites caller filter and update documents into flat dotted-path
//! operations whose leaf values are cast through the schema. Nested-object
//! shorthand under map or embedded paths (`{v: {n: 1}}`) resolves to the
//! same predicates as the explicit dotted form (`{"v.n": 1}`). Resolution
//! either succeeds completely or fails before anything reaches storage.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::ast::{Clause, Filter, FilterOp, Predicate, Update};
use super::errors::{QueryError, QueryResult};
use crate::cast::{cast_field, CastError};
use crate::observability::Event;
use crate::schema::{join_path, FieldDef, FieldType, PathTarget, Schema};

/// Resolves filter and update documents against a schema.
pub struct PathResolver<'a> {
    schema: &'a Schema,
    strict: bool,
}

impl<'a> PathResolver<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            strict: schema.strict,
        }
    }

    /// Overrides the schema's strictness for update paths
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Resolves a filter document.
    ///
    /// Supports `$eq $ne $gt $gte $lt $lte $in $nin $exists` on paths and
    /// `$and $or $nor` at the top level. Undeclared paths pass through.
    pub fn resolve_filter(&self, raw: &Value) -> QueryResult<Filter> {
        let filter = self.filter_object(raw)?;
        tracing::trace!(
            event = %Event::QueryResolved,
            schema = %self.schema.schema_id,
            filter = %filter.to_json(),
            "filter resolved"
        );
        Ok(filter)
    }

    /// Resolves an update document.
    ///
    /// Bare top-level keys are an implicit `$set`. Map-valued `$set`
    /// objects flatten to entry assignments. Undeclared paths are dropped
    /// when the schema is strict.
    pub fn resolve_update(&self, raw: &Value) -> QueryResult<Update> {
        let object = raw
            .as_object()
            .ok_or_else(|| QueryError::invalid(None, "update must be an object"))?;

        let mut update = Update::new();
        for (key, value) in object {
            match key.as_str() {
                "$set" => self.set_section(value, key, &mut update.set)?,
                "$setOnInsert" => self.set_section(value, key, &mut update.set_on_insert)?,
                "$unset" => {
                    for (path, raw) in section(value, key)? {
                        let keep = match self.schema.resolve_path(path) {
                            PathTarget::Unknown => self.unknown_update_path(path, raw)?,
                            _ => true,
                        };
                        if keep {
                            update.unset.push(path.clone());
                        }
                    }
                }
                "$inc" => {
                    for (path, amount) in section(value, key)? {
                        self.inc_path(path, amount, &mut update.inc)?;
                    }
                }
                op if op.starts_with('$') => return Err(QueryError::unknown_operator(None, op)),
                _ => self.set_path(key, value, &mut update.set)?,
            }
        }

        tracing::trace!(
            event = %Event::QueryResolved,
            schema = %self.schema.schema_id,
            update = %update.to_json(),
            "update resolved"
        );
        Ok(update)
    }

    fn filter_object(&self, raw: &Value) -> QueryResult<Filter> {
        let object = raw
            .as_object()
            .ok_or_else(|| QueryError::invalid(None, "filter must be an object"))?;

        let mut filter = Filter::new();
        for (key, value) in object {
            match key.as_str() {
                "$and" => filter.clauses.push(Clause::And(self.filter_list(key, value)?)),
                "$or" => filter.clauses.push(Clause::Or(self.filter_list(key, value)?)),
                "$nor" => filter.clauses.push(Clause::Nor(self.filter_list(key, value)?)),
                op if op.starts_with('$') => return Err(QueryError::unknown_operator(None, op)),
                path => self.condition(path, value, &mut filter)?,
            }
        }
        Ok(filter)
    }

    fn filter_list(&self, op: &str, raw: &Value) -> QueryResult<Vec<Filter>> {
        match raw {
            Value::Array(items) if !items.is_empty() => {
                items.iter().map(|item| self.filter_object(item)).collect()
            }
            _ => Err(QueryError::invalid(
                None,
                format!("{} requires a non-empty array of filters", op),
            )),
        }
    }

    fn condition(&self, path: &str, raw: &Value, filter: &mut Filter) -> QueryResult<()> {
        let object = match raw {
            Value::Object(object) if !object.is_empty() => object,
            _ => {
                let value = self.cast_leaf(path, raw)?;
                filter.clauses.push(Clause::Predicate(Predicate::eq(path, value)));
                return Ok(());
            }
        };

        let operators = object.keys().filter(|k| k.starts_with('$')).count();
        if operators == object.len() {
            for (op, operand) in object {
                let op = self.operator(path, op, operand)?;
                filter.clauses.push(Clause::Predicate(Predicate::new(path, op)));
            }
            return Ok(());
        }
        if operators > 0 {
            return Err(QueryError::invalid(
                Some(path),
                "cannot mix operators and field names",
            ));
        }

        if self.flattens(path) {
            for (key, value) in object {
                self.condition(&join_path(path, key), value, filter)?;
            }
        } else {
            let value = self.cast_leaf(path, raw)?;
            filter.clauses.push(Clause::Predicate(Predicate::eq(path, value)));
        }
        Ok(())
    }

    fn operator(&self, path: &str, op: &str, operand: &Value) -> QueryResult<FilterOp> {
        let list = |operand: &Value| -> QueryResult<Vec<Value>> {
            match operand {
                Value::Array(items) => items.iter().map(|item| self.cast_leaf(path, item)).collect(),
                _ => Err(QueryError::invalid(Some(path), format!("{} requires an array", op))),
            }
        };

        Ok(match op {
            "$eq" => FilterOp::Eq(self.cast_leaf(path, operand)?),
            "$ne" => FilterOp::Ne(self.cast_leaf(path, operand)?),
            "$gt" => FilterOp::Gt(self.cast_leaf(path, operand)?),
            "$gte" => FilterOp::Gte(self.cast_leaf(path, operand)?),
            "$lt" => FilterOp::Lt(self.cast_leaf(path, operand)?),
            "$lte" => FilterOp::Lte(self.cast_leaf(path, operand)?),
            "$in" => FilterOp::In(list(operand)?),
            "$nin" => FilterOp::Nin(list(operand)?),
            "$exists" => match operand {
                Value::Bool(present) => FilterOp::Exists(*present),
                _ => return Err(QueryError::invalid(Some(path), "$exists requires a boolean")),
            },
            other => return Err(QueryError::unknown_operator(Some(path), other)),
        })
    }

    /// Returns true when nested objects at `path` address sub-paths.
    fn flattens(&self, path: &str) -> bool {
        match self.schema.resolve_path(path) {
            PathTarget::Field(def) => addresses_children(def),
            _ => false,
        }
    }

    /// Casts a filter operand. Array fields compared with a single value
    /// cast it as an element.
    fn cast_leaf(&self, path: &str, raw: &Value) -> QueryResult<Value> {
        match self.schema.resolve_path(path) {
            PathTarget::Field(def) => Ok(cast_operand(def, path, raw)?),
            PathTarget::Mixed | PathTarget::Unknown => Ok(raw.clone()),
        }
    }

    fn set_section(
        &self,
        raw: &Value,
        op: &str,
        out: &mut IndexMap<String, Value>,
    ) -> QueryResult<()> {
        for (path, value) in section(raw, op)? {
            self.set_path(path, value, out)?;
        }
        Ok(())
    }

    fn set_path(&self, path: &str, raw: &Value, out: &mut IndexMap<String, Value>) -> QueryResult<()> {
        match self.schema.resolve_path(path) {
            PathTarget::Field(def) => match (&def.field_type, raw) {
                (FieldType::Map { .. }, Value::Object(entries)) if !entries.is_empty() => {
                    for (key, value) in entries {
                        let entry_path = join_path(path, key);
                        if key.is_empty() || key.starts_with('$') {
                            return Err(QueryError::invalid(
                                Some(&entry_path),
                                "map keys must be non-empty and not start with '$'",
                            ));
                        }
                        self.set_path(&entry_path, value, out)?;
                    }
                    Ok(())
                }
                _ => {
                    out.insert(path.to_string(), cast_field(def, path, raw)?.to_json());
                    Ok(())
                }
            },
            PathTarget::Mixed => {
                out.insert(path.to_string(), raw.clone());
                Ok(())
            }
            PathTarget::Unknown => {
                if self.unknown_update_path(path, raw)? {
                    out.insert(path.to_string(), raw.clone());
                }
                Ok(())
            }
        }
    }

    fn inc_path(&self, path: &str, raw: &Value, out: &mut IndexMap<String, Value>) -> QueryResult<()> {
        match self.schema.resolve_path(path) {
            PathTarget::Field(def) if matches!(def.field_type, FieldType::Number) => {
                let amount = cast_field(def, path, raw)?.to_json();
                if !amount.is_number() {
                    return Err(QueryError::invalid(Some(path), "$inc requires a number"));
                }
                out.insert(path.to_string(), amount);
            }
            PathTarget::Field(_) => {
                return Err(QueryError::invalid(Some(path), "$inc requires a number path"))
            }
            target => {
                if !raw.is_number() {
                    return Err(QueryError::invalid(Some(path), "$inc requires a number"));
                }
                if matches!(target, PathTarget::Mixed) || self.unknown_update_path(path, raw)? {
                    out.insert(path.to_string(), raw.clone());
                }
            }
        }
        Ok(())
    }

    /// Decides what happens to an update path the schema does not resolve.
    ///
    /// Undeclared fields are kept unless their schema is strict. A path
    /// running below a declared value that has no such child is rejected,
    /// since storing it would leave a value that no longer casts.
    fn unknown_update_path(&self, path: &str, raw: &Value) -> QueryResult<bool> {
        match undeclared(self.schema, self.strict, path) {
            Undeclared::Field { strict: false } => Ok(true),
            Undeclared::Field { strict: true } => {
                tracing::debug!(
                    event = %Event::UpdateRejected,
                    path,
                    "dropping undeclared update path"
                );
                Ok(false)
            }
            Undeclared::Below => Err(CastError::new(path, "path", raw.clone())
                .with_reason("path runs below a declared value")
                .into()),
        }
    }
}

/// Where an unresolved path leaves the schema.
enum Undeclared {
    /// An undeclared field of a schema with the given strictness
    Field { strict: bool },
    /// Below a declared value that has no such child
    Below,
}

fn undeclared(schema: &Schema, strict: bool, path: &str) -> Undeclared {
    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default();
    let mut def = match schema.lookup_field(head) {
        Some(def) => def,
        None => return Undeclared::Field { strict },
    };
    for segment in segments {
        def = match child(def, segment) {
            Ok(next) => next,
            Err(undeclared) => return undeclared,
        };
    }
    Undeclared::Below
}

fn child<'d>(def: &'d FieldDef, segment: &str) -> Result<&'d FieldDef, Undeclared> {
    match &def.field_type {
        FieldType::Map { of } => Ok(of),
        FieldType::Array { of } if segment.parse::<usize>().is_ok() => Ok(of),
        FieldType::Array { of } => child(of, segment),
        FieldType::Embedded { schema } => schema.lookup_field(segment).ok_or(Undeclared::Field {
            strict: schema.strict,
        }),
        _ => Err(Undeclared::Below),
    }
}

fn section<'v>(raw: &'v Value, op: &str) -> QueryResult<&'v Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| QueryError::invalid(None, format!("{} requires an object", op)))
}

fn addresses_children(def: &FieldDef) -> bool {
    match &def.field_type {
        FieldType::Map { .. } | FieldType::Embedded { .. } => true,
        FieldType::Array { of } => addresses_children(of),
        _ => false,
    }
}

fn cast_operand(def: &FieldDef, path: &str, raw: &Value) -> crate::cast::CastResult<Value> {
    match &def.field_type {
        FieldType::Array { of } if !raw.is_array() => cast_operand(of, path, raw),
        _ => cast_field(def, path, raw).map(|value| value.to_json()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryErrorCode;
    use indexmap::IndexMap;
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Schema::new("test", "v1", IndexMap::new())
            .field("v", FieldDef::map_of(FieldDef::number()))
            .field("tags", FieldDef::array_of(FieldDef::string()))
            .field("extra", FieldDef::mixed())
            .field(
                "profile",
                FieldDef::embedded(Schema::inline(IndexMap::new()).field("age", FieldDef::number())),
            )
            .compile()
            .unwrap()
    }

    #[test]
    fn test_nested_shorthand_equals_dotted_form() {
        let schema = schema();
        let resolver = PathResolver::new(&schema);

        let nested = resolver.resolve_filter(&json!({"v": {"n": "1"}})).unwrap();
        let dotted = resolver.resolve_filter(&json!({"v.n": 1})).unwrap();
        assert_eq!(nested, dotted);
        assert_eq!(nested, Filter::new().filter_eq("v.n", json!(1)));
    }

    #[test]
    fn test_filter_cast_failure_names_leaf_path() {
        let schema = schema();
        let err = PathResolver::new(&schema)
            .resolve_filter(&json!({"v": {"n": "abc"}}))
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::AeroCastFailed);
        assert_eq!(err.path(), Some("v.n"));
    }

    #[test]
    fn test_operators_cast_operands() {
        let schema = schema();
        let filter = PathResolver::new(&schema)
            .resolve_filter(&json!({"v.n": {"$gte": "2", "$in": ["3", 4]}, "tags": "a"}))
            .unwrap();
        assert_eq!(
            filter.clauses,
            vec![
                Clause::Predicate(Predicate::gte("v.n", json!(2))),
                Clause::Predicate(Predicate::new("v.n", FilterOp::In(vec![json!(3), json!(4)]))),
                Clause::Predicate(Predicate::eq("tags", json!("a"))),
            ]
        );
    }

    #[test]
    fn test_embedded_shorthand_flattens() {
        let schema = schema();
        let filter = PathResolver::new(&schema)
            .resolve_filter(&json!({"profile": {"age": {"$gt": "30"}}}))
            .unwrap();
        assert_eq!(
            filter,
            Filter::new().with_predicate(Predicate::new("profile.age", FilterOp::Gt(json!(30))))
        );
    }

    #[test]
    fn test_mixed_and_unknown_pass_through() {
        let schema = schema();
        let filter = PathResolver::new(&schema)
            .resolve_filter(&json!({"extra.a": "x", "other": {"k": 1}}))
            .unwrap();
        assert_eq!(
            filter,
            Filter::new()
                .filter_eq("extra.a", json!("x"))
                .filter_eq("other", json!({"k": 1}))
        );
    }

    #[test]
    fn test_logical_groups() {
        let schema = schema();
        let filter = PathResolver::new(&schema)
            .resolve_filter(&json!({"$or": [{"v.a": "1"}, {"v": {"b": 2}}]}))
            .unwrap();
        assert_eq!(
            filter.clauses,
            vec![Clause::Or(vec![
                Filter::new().filter_eq("v.a", json!(1)),
                Filter::new().filter_eq("v.b", json!(2)),
            ])]
        );
        assert!(PathResolver::new(&schema)
            .resolve_filter(&json!({"$or": []}))
            .is_err());
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let schema = schema();
        let err = PathResolver::new(&schema)
            .resolve_filter(&json!({"v.n": {"$regex": "x"}}))
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::AeroQueryUnknownOperator);
    }

    #[test]
    fn test_update_implicit_set_and_flattening() {
        let schema = schema();
        let update = PathResolver::new(&schema)
            .resolve_update(&json!({"v.n": "3", "$set": {"v": {"a": 1, "b": "2"}}}))
            .unwrap();
        let paths: Vec<&str> = update.set.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["v.n", "v.a", "v.b"]);
        assert_eq!(update.set["v.b"], json!(2));
    }

    #[test]
    fn test_update_cast_failure_rejects_everything() {
        let schema = schema();
        let err = PathResolver::new(&schema)
            .resolve_update(&json!({"$set": {"v.ok": 1, "v.n": "not a number"}}))
            .unwrap_err();
        assert_eq!(err.path(), Some("v.n"));
    }

    #[test]
    fn test_update_drops_unknown_paths_when_strict() {
        let schema = schema();
        let update = PathResolver::new(&schema)
            .resolve_update(&json!({"junk": 1, "$unset": {"v.x": ""}}))
            .unwrap();
        assert!(update.set.is_empty());
        assert_eq!(update.unset, vec!["v.x"]);

        let update = PathResolver::new(&schema)
            .with_strict(false)
            .resolve_update(&json!({"junk": 1}))
            .unwrap();
        assert_eq!(update.set["junk"], json!(1));
    }

    #[test]
    fn test_update_below_declared_value_rejected() {
        let schema = schema();
        for strict in [true, false] {
            let resolver = PathResolver::new(&schema).with_strict(strict);
            for update in [
                json!({"v.bad.deep": 5}),
                json!({"$inc": {"v.n.deep": 1}}),
                json!({"$unset": {"profile.age.x": ""}}),
            ] {
                let err = resolver.resolve_update(&update).unwrap_err();
                assert!(err.cast_error().is_some(), "accepted {}", update);
            }
        }
        let err = PathResolver::new(&schema)
            .with_strict(false)
            .resolve_update(&json!({"v.bad.deep": 5}))
            .unwrap_err();
        assert_eq!(err.path(), Some("v.bad.deep"));
    }

    #[test]
    fn test_undeclared_embedded_field_follows_embedded_strictness() {
        let loose = Schema::inline(IndexMap::new())
            .field("age", FieldDef::number())
            .with_strict(false);
        let loose_parent = Schema::new("test", "v1", IndexMap::new())
            .field("profile", FieldDef::embedded(loose))
            .compile()
            .unwrap();
        let update = PathResolver::new(&loose_parent)
            .resolve_update(&json!({"profile.note": "x"}))
            .unwrap();
        assert_eq!(update.set["profile.note"], json!("x"));

        let update = PathResolver::new(&schema())
            .resolve_update(&json!({"profile.note": "x"}))
            .unwrap();
        assert!(update.set.is_empty());
    }

    #[test]
    fn test_empty_map_object_assigns_whole_field() {
        let schema = schema();
        let update = PathResolver::new(&schema)
            .resolve_update(&json!({"$set": {"v": {}}}))
            .unwrap();
        assert_eq!(update.set["v"], json!({}));
    }

    #[test]
    fn test_inc_requires_number_path() {
        let schema = schema();
        let resolver = PathResolver::new(&schema);
        let update = resolver.resolve_update(&json!({"$inc": {"v.n": "2"}})).unwrap();
        assert_eq!(update.inc["v.n"], json!(2));

        assert!(resolver.resolve_update(&json!({"$inc": {"tags": 1}})).is_err());
    }
}
