//! Update application on stored JSON documents

use serde_json::{Map, Number, Value};

use super::errors::{StoreError, StoreResult};
use super::filters::values_equal;
use crate::query::{Filter, Update};

/// Applies `update` to `document` in place.
///
/// `$setOnInsert` applies only when `inserting`. Callers apply to a copy
/// and swap it in on success, so a failure leaves the stored document
/// unchanged.
pub fn apply_update(document: &mut Value, update: &Update, inserting: bool) -> StoreResult<()> {
    for (path, value) in &update.set {
        set_path(document, path, value.clone())?;
    }
    for path in &update.unset {
        unset_path(document, path);
    }
    for (path, amount) in &update.inc {
        inc_path(document, path, amount)?;
    }
    if inserting {
        for (path, value) in &update.set_on_insert {
            set_path(document, path, value.clone())?;
        }
    }
    Ok(())
}

/// Builds the initial document of an upsert from the filter's top-level
/// equality predicates.
pub fn seed_from_filter(filter: &Filter) -> StoreResult<Value> {
    let mut document = Value::Object(Map::new());
    for (path, value) in filter.equality_seeds() {
        set_path(&mut document, path, value.clone())?;
    }
    Ok(document)
}

/// Returns true if both documents are equal up to number encoding.
pub fn same_document(a: &Value, b: &Value) -> bool {
    values_equal(a, b)
}

/// Writes `value` at a dotted path, creating intermediate objects.
pub fn set_path(document: &mut Value, path: &str, value: Value) -> StoreResult<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let target = walk_create(document, &segments[..segments.len() - 1], path)?;
    let last = segments[segments.len() - 1];
    match target {
        Value::Object(object) => {
            object.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => match last.parse::<usize>() {
            Ok(index) if index < items.len() => {
                items[index] = value;
                Ok(())
            }
            _ => Err(StoreError::invalid_update(path, "array index out of range")),
        },
        _ => Err(StoreError::invalid_update(path, "parent is not an object")),
    }
}

/// Removes the value at a dotted path; missing paths are ignored.
pub fn unset_path(document: &mut Value, path: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };
    let mut current = document;
    for segment in parents {
        current = match child_mut(current, segment) {
            Some(next) => next,
            None => return,
        };
    }
    match current {
        Value::Object(object) => {
            object.shift_remove(*last);
        }
        Value::Array(items) => {
            if let Some(item) = last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                *item = Value::Null;
            }
        }
        _ => {}
    }
}

fn inc_path(document: &mut Value, path: &str, amount: &Value) -> StoreResult<()> {
    let delta = amount
        .as_f64()
        .ok_or_else(|| StoreError::invalid_update(path, "$inc amount must be a number"))?;

    let current = get_path(document, path);
    let next = match current {
        None | Some(Value::Null) => amount.clone(),
        Some(Value::Number(n)) => {
            let sum = match (n.as_i64(), amount.as_i64()) {
                (Some(a), Some(b)) => a.checked_add(b).map(Number::from),
                _ => None,
            };
            match sum {
                Some(sum) => Value::Number(sum),
                None => n
                    .as_f64()
                    .and_then(|a| Number::from_f64(a + delta))
                    .map(Value::Number)
                    .ok_or_else(|| StoreError::invalid_update(path, "increment overflows"))?,
            }
        }
        Some(_) => return Err(StoreError::invalid_update(path, "cannot increment a non-number")),
    };
    set_path(document, path, next)
}

fn get_path<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(document, |current, segment| match current {
        Value::Object(object) => object.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    })
}

fn child_mut<'v>(value: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    match value {
        Value::Object(object) => object.get_mut(segment),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn walk_create<'v>(document: &'v mut Value, segments: &[&str], path: &str) -> StoreResult<&'v mut Value> {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(document),
    };
    let next = match document {
        Value::Object(object) => {
            let slot = object
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            slot
        }
        Value::Array(items) => match head.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(item) => item,
            None => return Err(StoreError::invalid_update(path, "array index out of range")),
        },
        _ => return Err(StoreError::invalid_update(path, "parent is not an object")),
    };
    walk_create(next, rest, path)
}
