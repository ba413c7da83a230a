//! Declarative and custom field validators
//!
//! Built-in validators serialize with the schema; custom validators are
//! closures registered in code and are skipped by serde.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::FieldValue;

/// Predicate signature for code-defined validators.
pub type ValidatorFn = dyn Fn(&FieldValue) -> bool + Send + Sync;

/// A validator attached to a field declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validator {
    /// Numeric lower bound (inclusive)
    Min { value: f64 },
    /// Numeric upper bound (inclusive)
    Max { value: f64 },
    /// Minimum string length (chars) or array length
    MinLength { value: usize },
    /// Maximum string length (chars) or array length
    MaxLength { value: usize },
    /// Value must equal one of the listed values
    Enum { values: Vec<Value> },
    /// String must match the regular expression
    Match {
        pattern: String,
        /// Compiled when the schema is compiled, or on first check
        #[serde(skip)]
        compiled: OnceLock<Regex>,
    },
    /// Code-defined predicate
    #[serde(skip)]
    Custom(CustomValidator),
}

impl Validator {
    /// Creates a `match` validator for a regular expression.
    pub fn matches(pattern: impl Into<String>) -> Self {
        Validator::Match {
            pattern: pattern.into(),
            compiled: OnceLock::new(),
        }
    }

    /// Creates a custom validator from a predicate.
    pub fn custom<F>(name: impl Into<String>, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        Validator::Custom(CustomValidator {
            name: name.into(),
            message: message.into(),
            check: Arc::new(check),
        })
    }

    /// Returns the validator kind used in error reports.
    pub fn kind(&self) -> &str {
        match self {
            Validator::Min { .. } => "min",
            Validator::Max { .. } => "max",
            Validator::MinLength { .. } => "min_length",
            Validator::MaxLength { .. } => "max_length",
            Validator::Enum { .. } => "enum",
            Validator::Match { .. } => "match",
            Validator::Custom(custom) => &custom.name,
        }
    }

    /// Checks the structure of the validator itself.
    pub(crate) fn check_declaration(&self) -> Result<(), String> {
        match self {
            Validator::Match { pattern, compiled } => Regex::new(pattern)
                .map(|re| {
                    let _ = compiled.set(re);
                })
                .map_err(|e| format!("pattern '{}' does not compile: {}", pattern, e)),
            Validator::Min { value } | Validator::Max { value } if !value.is_finite() => {
                Err("numeric bound must be finite".into())
            }
            _ => Ok(()),
        }
    }

    /// Runs the validator. Returns the failure message, or `None` on success.
    pub fn check(&self, value: &FieldValue) -> Option<String> {
        match self {
            Validator::Min { value: bound } => match value {
                FieldValue::Number(n) if n < bound => {
                    Some(format!("value {} is less than minimum {}", n, bound))
                }
                _ => None,
            },
            Validator::Max { value: bound } => match value {
                FieldValue::Number(n) if n > bound => {
                    Some(format!("value {} is more than maximum {}", n, bound))
                }
                _ => None,
            },
            Validator::MinLength { value: bound } => match length_of(value) {
                Some(len) if len < *bound => {
                    Some(format!("length {} is shorter than minimum {}", len, bound))
                }
                _ => None,
            },
            Validator::MaxLength { value: bound } => match length_of(value) {
                Some(len) if len > *bound => {
                    Some(format!("length {} is longer than maximum {}", len, bound))
                }
                _ => None,
            },
            Validator::Enum { values } => {
                let actual = value.to_json();
                if values.iter().any(|allowed| json_equal(allowed, &actual)) {
                    None
                } else {
                    Some(format!("{} is not an allowed value", actual))
                }
            }
            Validator::Match { pattern, compiled } => match value {
                FieldValue::String(s) => {
                    let matched = regex_for(pattern, compiled).map_or(false, |re| re.is_match(s));
                    if matched {
                        None
                    } else {
                        Some(format!("'{}' does not match /{}/", s, pattern))
                    }
                }
                _ => None,
            },
            Validator::Custom(custom) => {
                if (custom.check)(value) {
                    None
                } else {
                    Some(custom.message.clone())
                }
            }
        }
    }
}

/// A named, code-defined validator.
#[derive(Clone)]
pub struct CustomValidator {
    /// Name reported as the failing validator kind
    pub name: String,
    /// Message reported on failure
    pub message: String,
    check: Arc<ValidatorFn>,
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

fn regex_for<'a>(pattern: &str, compiled: &'a OnceLock<Regex>) -> Option<&'a Regex> {
    if compiled.get().is_none() {
        let _ = compiled.set(Regex::new(pattern).ok()?);
    }
    compiled.get()
}

fn length_of(value: &FieldValue) -> Option<usize> {
    match value {
        FieldValue::String(s) => Some(s.chars().count()),
        FieldValue::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// JSON equality treating integer and float encodings of a number as equal.
pub(crate) fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_min_max() {
        let min = Validator::Min { value: 0.0 };
        assert!(min.check(&FieldValue::Number(1.0)).is_none());
        assert!(min.check(&FieldValue::Number(-1.0)).is_some());

        let max = Validator::Max { value: 10.0 };
        assert!(max.check(&FieldValue::Number(10.0)).is_none());
        assert!(max.check(&FieldValue::Number(11.0)).is_some());
    }

    #[test]
    fn test_length_applies_to_strings_and_arrays() {
        let min = Validator::MinLength { value: 3 };
        assert!(min.check(&FieldValue::String("ab".into())).is_some());
        assert!(min.check(&FieldValue::String("abc".into())).is_none());
        assert!(min
            .check(&FieldValue::Array(vec![FieldValue::Null; 3]))
            .is_none());
    }

    #[test]
    fn test_enum_matches_numbers_across_encodings() {
        let v = Validator::Enum {
            values: vec![json!(1.0), json!("a")],
        };
        assert!(v.check(&FieldValue::Number(1.0)).is_none());
        assert!(v.check(&FieldValue::String("a".into())).is_none());
        assert!(v.check(&FieldValue::String("b".into())).is_some());
    }

    #[test]
    fn test_match() {
        let v = Validator::matches("^[a-z]+$");
        assert!(v.check(&FieldValue::String("abc".into())).is_none());
        assert!(v.check(&FieldValue::String("ABC".into())).is_some());
    }

    #[test]
    fn test_match_pattern_compiled_once() {
        let v = Validator::matches("^a");
        v.check_declaration().unwrap();
        let cached = match &v {
            Validator::Match { compiled, .. } => compiled.get().map(|re| re as *const Regex),
            _ => None,
        };
        assert!(cached.is_some());

        // Clones made when the schema compiles carry the compiled regex.
        let copy = v.clone();
        assert!(matches!(&copy, Validator::Match { compiled, .. } if compiled.get().is_some()));

        v.check(&FieldValue::String("abc".into()));
        let after = match &v {
            Validator::Match { compiled, .. } => compiled.get().map(|re| re as *const Regex),
            _ => None,
        };
        assert_eq!(cached, after);
    }

    #[test]
    fn test_bad_pattern_rejected_at_declaration() {
        let v = Validator::matches("(");
        assert!(v.check_declaration().is_err());
        assert!(v.check(&FieldValue::String("(".into())).is_some());
    }

    #[test]
    fn test_custom_reports_name_and_message() {
        let v = Validator::custom("even", "must be even", |value| {
            matches!(value, FieldValue::Number(n) if n % 2.0 == 0.0)
        });
        assert_eq!(v.kind(), "even");
        assert!(v.check(&FieldValue::Number(2.0)).is_none());
        assert_eq!(v.check(&FieldValue::Number(3.0)).as_deref(), Some("must be even"));
    }

    #[test]
    fn test_serde_roundtrip_of_builtin() {
        let v: Validator = serde_json::from_value(json!({"kind": "min", "value": 5})).unwrap();
        assert!(matches!(v, Validator::Min { value } if value == 5.0));
    }
}
