//! Casting of raw JSON input into declared field types
//!
//! Coercion table:
//!
//! | Type    | Accepted                                                      |
//! |---------|---------------------------------------------------------------|
//! | Number  | numbers; numeric strings (trimmed, scientific notation ok);   |
//! |         | `true`/`false` as 1/0; `""` as null                           |
//! | String  | strings; numbers and booleans via their display form          |
//! | Boolean | booleans; 1/0; "true" "false" "1" "0" "yes" "no"              |
//! | Date    | RFC 3339 or `YYYY-MM-DD` strings; numbers as epoch millis      |
//! | Uuid    | strings parseable as a UUID                                   |
//! | Mixed   | anything                                                      |
//!
//! `null` casts to `Null` for every type.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{CastError, CastResult};
use crate::document::{DocMap, Document, FieldValue};
use crate::schema::{join_path, FieldDef, FieldType, ScalarType};

/// Casts a raw value into the type declared by `def`.
///
/// `path` is the full dotted path of the value and is reported on failure.
pub fn cast_field(def: &FieldDef, path: &str, raw: &Value) -> CastResult<FieldValue> {
    if raw.is_null() {
        return Ok(FieldValue::Null);
    }

    match &def.field_type {
        FieldType::Map { of } => match raw {
            Value::Object(entries) => {
                DocMap::from_entries(path, of.clone(), entries).map(FieldValue::Map)
            }
            _ => Err(CastError::new(path, "Map", raw.clone())),
        },
        FieldType::Array { of } => {
            let items = match raw {
                Value::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            items
                .iter()
                .enumerate()
                .map(|(i, item)| cast_field(of, &join_path(path, &i.to_string()), item))
                .collect::<CastResult<Vec<_>>>()
                .map(FieldValue::Array)
        }
        FieldType::Embedded { schema } => match raw {
            Value::Object(_) => {
                Document::embedded(schema, path, raw).map(|doc| FieldValue::Document(Box::new(doc)))
            }
            _ => Err(CastError::new(path, "Embedded", raw.clone())),
        },
        scalar => match scalar.scalar() {
            Some(ty) => cast_scalar(ty, path, raw),
            None => Err(CastError::new(path, scalar.type_name(), raw.clone())),
        },
    }
}

/// Casts a raw value into a scalar type.
pub fn cast_scalar(ty: ScalarType, path: &str, raw: &Value) -> CastResult<FieldValue> {
    let fail = || CastError::new(path, ty.type_name(), raw.clone());

    if raw.is_null() {
        return Ok(FieldValue::Null);
    }

    match ty {
        ScalarType::Mixed => Ok(FieldValue::Mixed(raw.clone())),
        ScalarType::Number => match raw {
            Value::Number(n) => n.as_f64().map(FieldValue::Number).ok_or_else(fail),
            Value::Bool(b) => Ok(FieldValue::Number(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(FieldValue::Null);
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(FieldValue::Number(n)),
                    _ => Err(fail()),
                }
            }
            _ => Err(fail()),
        },
        ScalarType::String => match raw {
            Value::String(s) => Ok(FieldValue::String(s.clone())),
            Value::Number(n) => Ok(FieldValue::String(n.to_string())),
            Value::Bool(b) => Ok(FieldValue::String(b.to_string())),
            _ => Err(fail()),
        },
        ScalarType::Boolean => match raw {
            Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            Value::Number(n) => match n.as_f64() {
                Some(x) if x == 1.0 => Ok(FieldValue::Bool(true)),
                Some(x) if x == 0.0 => Ok(FieldValue::Bool(false)),
                _ => Err(fail()),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(FieldValue::Bool(true)),
                "false" | "0" | "no" => Ok(FieldValue::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        ScalarType::Date => match raw {
            Value::String(s) => parse_date(s.trim()).map(FieldValue::Date).ok_or_else(fail),
            Value::Number(n) => n
                .as_f64()
                .filter(|ms| ms.is_finite())
                .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
                .map(FieldValue::Date)
                .ok_or_else(fail),
            _ => Err(fail()),
        },
        ScalarType::Uuid => match raw {
            Value::String(s) => Uuid::parse_str(s.trim())
                .map(FieldValue::Uuid)
                .map_err(|e| fail().with_reason(e.to_string())),
            _ => Err(fail()),
        },
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
