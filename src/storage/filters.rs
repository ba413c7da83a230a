//! Predicate evaluation against stored documents
//!
//! Paths are dotted. A segment that meets an array fans out over its
//! elements, and numeric segments index arrays. Numbers compare by value
//! regardless of integer or float encoding.

use std::cmp::Ordering;

use serde_json::Value;

use crate::query::{Clause, Filter, FilterOp, Predicate};

/// Evaluates resolved filters against documents
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a document matches every clause of the filter
    pub fn matches(document: &Value, filter: &Filter) -> bool {
        filter
            .clauses
            .iter()
            .all(|clause| Self::matches_clause(document, clause))
    }

    fn matches_clause(document: &Value, clause: &Clause) -> bool {
        match clause {
            Clause::Predicate(predicate) => Self::matches_predicate(document, predicate),
            Clause::And(filters) => filters.iter().all(|f| Self::matches(document, f)),
            Clause::Or(filters) => filters.iter().any(|f| Self::matches(document, f)),
            Clause::Nor(filters) => !filters.iter().any(|f| Self::matches(document, f)),
        }
    }

    /// Checks if a document matches a single predicate
    fn matches_predicate(document: &Value, predicate: &Predicate) -> bool {
        let segments: Vec<&str> = predicate.field.split('.').collect();
        let mut candidates = Vec::new();
        collect_values(document, &segments, &mut candidates);

        match &predicate.op {
            FilterOp::Eq(expected) => eq_match(&candidates, expected),
            FilterOp::Ne(expected) => !eq_match(&candidates, expected),
            FilterOp::Gt(bound) => any_compares(&candidates, bound, Ordering::is_gt),
            FilterOp::Gte(bound) => any_compares(&candidates, bound, Ordering::is_ge),
            FilterOp::Lt(bound) => any_compares(&candidates, bound, Ordering::is_lt),
            FilterOp::Lte(bound) => any_compares(&candidates, bound, Ordering::is_le),
            FilterOp::In(values) => values.iter().any(|v| eq_match(&candidates, v)),
            FilterOp::Nin(values) => !values.iter().any(|v| eq_match(&candidates, v)),
            FilterOp::Exists(present) => candidates.is_empty() != *present,
        }
    }
}

/// Collects every value reachable at `segments`.
fn collect_values<'v>(value: &'v Value, segments: &[&str], out: &mut Vec<&'v Value>) {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => {
            out.push(value);
            return;
        }
    };

    match value {
        Value::Object(object) => {
            if let Some(next) = object.get(*head) {
                collect_values(next, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    collect_values(item, rest, out);
                }
            }
            for item in items.iter().filter(|item| item.is_object()) {
                collect_values(item, segments, out);
            }
        }
        _ => {}
    }
}

/// Equality; null also matches a missing path, arrays match by element.
fn eq_match(candidates: &[&Value], expected: &Value) -> bool {
    if expected.is_null() && candidates.is_empty() {
        return true;
    }
    candidates.iter().any(|actual| {
        values_equal(actual, expected)
            || matches!(actual, Value::Array(items) if items.iter().any(|item| values_equal(item, expected)))
    })
}

fn any_compares(candidates: &[&Value], bound: &Value, accept: fn(Ordering) -> bool) -> bool {
    candidates.iter().any(|actual| {
        let direct = compare(actual, bound).map_or(false, accept);
        direct
            || matches!(actual, Value::Array(items)
                if items.iter().any(|item| compare(item, bound).map_or(false, accept)))
    })
}

/// Orders numbers with numbers and strings with strings; nothing else.
fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Deep equality treating integer and float encodings of a number as equal.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map_or(false, |y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(doc: &Value, filter: Filter) -> bool {
        PredicateFilter::matches(doc, &filter)
    }

    #[test]
    fn test_dotted_equality() {
        let doc = json!({"v": {"x": 1}});
        assert!(matches(&doc, Filter::new().filter_eq("v.x", json!(1.0))));
        assert!(!matches(&doc, Filter::new().filter_eq("v.x", json!(2))));
        assert!(!matches(&doc, Filter::new().filter_eq("v.y", json!(1))));
    }

    #[test]
    fn test_no_type_coercion() {
        let doc = json!({"value": 123});
        assert!(!matches(&doc, Filter::new().filter_eq("value", json!("123"))));
    }

    #[test]
    fn test_array_fan_out() {
        let doc = json!({
            "employees": [
                {"__t": "Engineer", "apiKeys": {"github": "g1"}},
                {"__t": "Designer", "tools": ["pen"]}
            ]
        });
        assert!(matches(&doc, Filter::new().filter_eq("employees.apiKeys.github", json!("g1"))));
        assert!(matches(&doc, Filter::new().filter_eq("employees.tools", json!("pen"))));
        assert!(matches(&doc, Filter::new().filter_eq("employees.1.__t", json!("Designer"))));
        assert!(!matches(&doc, Filter::new().filter_eq("employees.0.__t", json!("Designer"))));
    }

    #[test]
    fn test_ranges_and_membership() {
        let doc = json!({"age": 25, "name": "b"});
        assert!(matches(&doc, Filter::new().with_predicate(Predicate::gte("age", json!(25)))));
        assert!(!matches(&doc, Filter::new().with_predicate(Predicate::lt("age", json!(25)))));
        assert!(matches(
            &doc,
            Filter::new().with_predicate(Predicate::new("name", FilterOp::In(vec![json!("a"), json!("b")])))
        ));
        assert!(matches(
            &doc,
            Filter::new().with_predicate(Predicate::new("name", FilterOp::Nin(vec![json!("c")])))
        ));
    }

    #[test]
    fn test_exists_and_null() {
        let doc = json!({"v": {"x": null}});
        assert!(matches(&doc, Filter::new().with_predicate(Predicate::exists("v.x", true))));
        assert!(matches(&doc, Filter::new().with_predicate(Predicate::exists("v.y", false))));
        assert!(matches(&doc, Filter::new().filter_eq("v.y", Value::Null)));
    }

    #[test]
    fn test_logical_clauses() {
        let doc = json!({"a": 1, "b": 2});
        let mut filter = Filter::new();
        filter.clauses.push(Clause::Or(vec![
            Filter::new().filter_eq("a", json!(5)),
            Filter::new().filter_eq("b", json!(2)),
        ]));
        assert!(matches(&doc, filter));

        let mut filter = Filter::new();
        filter.clauses.push(Clause::Nor(vec![Filter::new().filter_eq("a", json!(1))]));
        assert!(!matches(&doc, filter));
    }
}
