//! Resolved filter and update structures
//!
//! Every path is a flat dotted path and every value has already been cast
//! through the schema, so storage consumes these without further checks.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Filter operation types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Equality: field = value (array fields match any element)
    Eq(Value),
    /// Inequality
    Ne(Value),
    /// Greater than: field > value
    Gt(Value),
    /// Greater than or equal: field >= value
    Gte(Value),
    /// Less than: field < value
    Lt(Value),
    /// Less than or equal: field <= value
    Lte(Value),
    /// Membership
    In(Vec<Value>),
    /// Non-membership
    Nin(Vec<Value>),
    /// Presence check
    Exists(bool),
}

impl FilterOp {
    /// Returns the operator as written in a filter document
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "$eq",
            FilterOp::Ne(_) => "$ne",
            FilterOp::Gt(_) => "$gt",
            FilterOp::Gte(_) => "$gte",
            FilterOp::Lt(_) => "$lt",
            FilterOp::Lte(_) => "$lte",
            FilterOp::In(_) => "$in",
            FilterOp::Nin(_) => "$nin",
            FilterOp::Exists(_) => "$exists",
        }
    }

    fn operand(&self) -> Value {
        match self {
            FilterOp::Eq(v)
            | FilterOp::Ne(v)
            | FilterOp::Gt(v)
            | FilterOp::Gte(v)
            | FilterOp::Lt(v)
            | FilterOp::Lte(v) => v.clone(),
            FilterOp::In(vs) | FilterOp::Nin(vs) => Value::Array(vs.clone()),
            FilterOp::Exists(b) => Value::Bool(*b),
        }
    }
}

/// A single predicate (dotted path + operation)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Dotted field path
    pub field: String,
    /// Filter operation
    pub op: FilterOp,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    /// Create an equality predicate
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Eq(value))
    }

    /// Create a range predicate (gte)
    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Gte(value))
    }

    /// Create a range predicate (lt)
    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Lt(value))
    }

    /// Create a presence predicate
    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Self::new(field, FilterOp::Exists(present))
    }
}

/// One conjunct of a filter
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Predicate(Predicate),
    /// Every sub-filter matches
    And(Vec<Filter>),
    /// At least one sub-filter matches
    Or(Vec<Filter>),
    /// No sub-filter matches
    Nor(Vec<Filter>),
}

/// Resolved filter: all clauses combined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<Clause>,
}

impl Filter {
    /// Creates an empty filter, matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on `_id` equality
    pub fn by_id(id: Value) -> Self {
        Self::new().with_predicate(Predicate::eq("_id", id))
    }

    /// Adds a predicate
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.clauses.push(Clause::Predicate(predicate));
        self
    }

    /// Adds an equality predicate
    pub fn filter_eq(self, field: impl Into<String>, value: Value) -> Self {
        self.with_predicate(Predicate::eq(field, value))
    }

    /// Returns true if the filter has no clauses
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Top-level predicates, ignoring logical groups
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.clauses.iter().filter_map(|clause| match clause {
            Clause::Predicate(p) => Some(p),
            _ => None,
        })
    }

    /// Top-level equality predicates, which seed upsert-inserted documents
    pub fn equality_seeds(&self) -> Vec<(&str, &Value)> {
        self.predicates()
            .filter_map(|p| match &p.op {
                FilterOp::Eq(value) => Some((p.field.as_str(), value)),
                _ => None,
            })
            .collect()
    }

    /// Filter document form, for logging and explain output
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        let mut groups: Vec<Value> = Vec::new();
        for clause in &self.clauses {
            match clause {
                Clause::Predicate(p) => {
                    let entry = out
                        .entry(p.field.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(ops) = entry {
                        ops.insert(p.op.op_name().to_string(), p.op.operand());
                    }
                }
                Clause::And(fs) => groups.push(group("$and", fs)),
                Clause::Or(fs) => groups.push(group("$or", fs)),
                Clause::Nor(fs) => groups.push(group("$nor", fs)),
            }
        }
        if !groups.is_empty() {
            out.insert("$and".to_string(), Value::Array(groups));
        }
        Value::Object(out)
    }
}

fn group(op: &str, filters: &[Filter]) -> Value {
    let mut object = Map::new();
    object.insert(
        op.to_string(),
        Value::Array(filters.iter().map(Filter::to_json).collect()),
    );
    Value::Object(object)
}

/// Resolved update operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Dotted path assignments
    pub set: IndexMap<String, Value>,
    /// Dotted paths to remove
    pub unset: Vec<String>,
    /// Numeric increments
    pub inc: IndexMap<String, Value>,
    /// Assignments applied only when an upsert inserts
    pub set_on_insert: IndexMap<String, Value>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: assign a path
    pub fn with_set(mut self, path: impl Into<String>, value: Value) -> Self {
        self.set.insert(path.into(), value);
        self
    }

    /// Builder: remove a path
    pub fn with_unset(mut self, path: impl Into<String>) -> Self {
        self.unset.push(path.into());
        self
    }

    /// Returns true if the update does nothing
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.inc.is_empty()
            && self.set_on_insert.is_empty()
    }

    /// Paths written by `$set`, `$unset` and `$inc`
    pub fn touched_paths(&self) -> Vec<&str> {
        self.set
            .keys()
            .chain(self.unset.iter())
            .chain(self.inc.keys())
            .map(String::as_str)
            .collect()
    }

    /// Update document form, for logging and explain output
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        let section = |entries: &IndexMap<String, Value>| {
            Value::Object(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        };
        if !self.set.is_empty() {
            out.insert("$set".to_string(), section(&self.set));
        }
        if !self.unset.is_empty() {
            let unset = self
                .unset
                .iter()
                .map(|path| (path.clone(), Value::String(String::new())))
                .collect();
            out.insert("$unset".to_string(), Value::Object(unset));
        }
        if !self.inc.is_empty() {
            out.insert("$inc".to_string(), section(&self.inc));
        }
        if !self.set_on_insert.is_empty() {
            out.insert("$setOnInsert".to_string(), section(&self.set_on_insert));
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equality_seeds_skip_ranges_and_groups() {
        let mut filter = Filter::new()
            .filter_eq("v.x", json!(1))
            .with_predicate(Predicate::lt("n", json!(3)));
        filter.clauses.push(Clause::Or(vec![Filter::new().filter_eq("a", json!(1))]));

        let seeds = filter.equality_seeds();
        assert_eq!(seeds, vec![("v.x", &json!(1))]);
    }

    #[test]
    fn test_filter_to_json() {
        let filter = Filter::new()
            .filter_eq("v.x", json!(1))
            .with_predicate(Predicate::exists("v.y", false));
        assert_eq!(
            filter.to_json(),
            json!({"v.x": {"$eq": 1}, "v.y": {"$exists": false}})
        );
    }

    #[test]
    fn test_update_touched_paths() {
        let update = Update::new().with_set("v.x", json!(1)).with_unset("v.y");
        assert_eq!(update.touched_paths(), vec!["v.x", "v.y"]);
        assert!(!update.is_empty());
        assert_eq!(
            update.to_json(),
            json!({"$set": {"v.x": 1}, "$unset": {"v.y": ""}})
        );
    }
}
