//! Structural matchers over values extracted from a response body.
//!
//! Every matcher is a pure function of its input. A path that does not
//! exist never satisfies any matcher: absence is reported as
//! [`PATH_NOT_FOUND`] regardless of the variant.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Diagnostic reported for every matcher evaluated against a missing path.
pub const PATH_NOT_FOUND: &str = "path not found";

/// Runtime kind of a JSON value, used by [`Matcher::IsType`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
    Null,
    Bool,
    Number,
    Integer,
    String,
    Array,
    Object,
}

impl Kind {
    /// Kind of `value`. Numbers report [`Kind::Number`]; use
    /// [`Kind::matches`] to also accept [`Kind::Integer`].
    pub fn of(value: &Value) -> Kind {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Kind::Integer, Value::Number(n)) => {
                n.is_i64()
                    || n.is_u64()
                    || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            (kind, value) => kind == Kind::of(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "matcher", content = "value", rename_all = "snake_case")]
pub enum Matcher {
    Equals(Value),
    /// Set membership: equal to any of the candidates.
    OneOf(Vec<Value>),
    NotNull,
    NotEmpty,
    IsType(Kind),
}

/// Outcome of a single matcher evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
}

impl Verdict {
    fn pass(message: impl Into<String>) -> Verdict {
        Verdict {
            passed: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Verdict {
        Verdict {
            passed: false,
            message: message.into(),
        }
    }
}

impl Matcher {
    pub fn equals(expected: impl Into<Value>) -> Matcher {
        Matcher::Equals(expected.into())
    }

    pub fn one_of<V: Into<Value>>(candidates: impl IntoIterator<Item = V>) -> Matcher {
        Matcher::OneOf(candidates.into_iter().map(Into::into).collect())
    }

    /// Evaluate the matcher. `None` means the path did not resolve.
    pub fn evaluate(&self, value: Option<&Value>) -> Verdict {
        let Some(value) = value else {
            return Verdict::fail(PATH_NOT_FOUND);
        };

        match self {
            Matcher::Equals(expected) => {
                if loosely_equal(expected, value) {
                    Verdict::pass(format!("equals {expected}"))
                } else {
                    Verdict::fail(format!("expected {expected} but was {value}"))
                }
            }
            Matcher::OneOf(candidates) => {
                match candidates.iter().find(|c| loosely_equal(c, value)) {
                    Some(found) => Verdict::pass(format!("equals {found}")),
                    None => Verdict::fail(format!(
                        "expected one of {} but was {value}",
                        Value::Array(candidates.clone())
                    )),
                }
            }
            Matcher::NotNull => {
                if value.is_null() {
                    Verdict::fail("expected a non-null value but was null")
                } else {
                    Verdict::pass("is not null")
                }
            }
            Matcher::NotEmpty => match value {
                Value::Array(items) if !items.is_empty() => {
                    Verdict::pass(format!("array with {} element(s)", items.len()))
                }
                Value::Object(map) if !map.is_empty() => {
                    Verdict::pass(format!("object with {} key(s)", map.len()))
                }
                Value::Array(_) | Value::Object(_) => {
                    Verdict::fail(format!("expected a non-empty {} but was empty", Kind::of(value)))
                }
                other => Verdict::fail(format!(
                    "expected a non-empty array or object but was {}",
                    Kind::of(other)
                )),
            },
            Matcher::IsType(kind) => {
                if kind.matches(value) {
                    Verdict::pass(format!("is {kind}"))
                } else {
                    Verdict::fail(format!("expected {kind} but was {}", Kind::of(value)))
                }
            }
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Equals(expected) => write!(f, "equals {expected}"),
            Matcher::OneOf(candidates) => {
                write!(f, "one of {}", Value::Array(candidates.clone()))
            }
            Matcher::NotNull => f.write_str("not null"),
            Matcher::NotEmpty => f.write_str("not empty"),
            Matcher::IsType(kind) => write!(f, "is {kind}"),
        }
    }
}

/// Deep equality where numbers compare by value, so `13` equals `13.0`.
fn loosely_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| loosely_equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, a)| b.get(key).is_some_and(|b| loosely_equal(a, b)))
        }
        (a, b) => a == b,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    let as_int = |n: &Number| {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    };
    match (as_int(a), as_int(b)) {
        (Some(a), Some(b)) => a == b,
        (Some(i), None) => int_equals_float(i, b),
        (None, Some(i)) => int_equals_float(i, a),
        (None, None) => matches!((a.as_f64(), b.as_f64()), (Some(a), Some(b)) if a == b),
    }
}

// An integer that does not survive a round trip through f64 equals no float.
fn int_equals_float(int: i128, float: &Number) -> bool {
    let widened = int as f64;
    widened as i128 == int && float.as_f64() == Some(widened)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(Matcher::equals("x"); "equals")]
    #[test_case(Matcher::one_of(["x", "y"]); "one of")]
    #[test_case(Matcher::NotNull; "not null")]
    #[test_case(Matcher::NotEmpty; "not empty")]
    #[test_case(Matcher::IsType(Kind::Null); "is null type")]
    fn absent_path_always_fails(matcher: Matcher) {
        let verdict = matcher.evaluate(None);
        assert!(!verdict.passed);
        assert_eq!(verdict.message, PATH_NOT_FOUND);
    }

    #[test_case(json!(13); "integer")]
    #[test_case(json!(13.0); "float")]
    fn equals_compares_numbers_by_value(actual: Value) {
        assert!(Matcher::equals(13).evaluate(Some(&actual)).passed);
        assert!(Matcher::equals(13.0).evaluate(Some(&actual)).passed);
    }

    #[test]
    fn equals_float_precision() {
        assert!(Matcher::equals(4.26).evaluate(Some(&json!(4.26))).passed);
        assert!(!Matcher::equals(4.26).evaluate(Some(&json!(4.27))).passed);
        assert!(!Matcher::equals(13).evaluate(Some(&json!(13.5))).passed);
    }

    #[test]
    fn equals_never_matches_null() {
        let verdict = Matcher::equals("x").evaluate(Some(&Value::Null));
        assert!(!verdict.passed);
        assert_eq!(verdict.message, "expected \"x\" but was null");
    }

    #[test]
    fn equals_does_not_coerce_strings_to_numbers() {
        assert!(!Matcher::equals(1).evaluate(Some(&json!("1"))).passed);
    }

    #[test]
    fn equals_is_deep() {
        let actual = json!({"tags": [1.0, 2], "meta": {"ok": true}});
        let expected = json!({"meta": {"ok": true}, "tags": [1, 2.0]});
        assert!(Matcher::Equals(expected).evaluate(Some(&actual)).passed);

        let shorter = json!({"tags": [1], "meta": {"ok": true}});
        assert!(!Matcher::Equals(shorter).evaluate(Some(&actual)).passed);
    }

    #[test]
    fn equals_large_unsigned() {
        let big = json!(u64::MAX);
        assert!(Matcher::equals(u64::MAX).evaluate(Some(&big)).passed);
        assert!(!Matcher::equals(-1).evaluate(Some(&big)).passed);
    }

    #[test]
    fn equals_rejects_integers_beyond_float_precision() {
        let nearby = json!(9007199254740992.0);
        assert!(!Matcher::equals(9007199254740993i64).evaluate(Some(&nearby)).passed);
        assert!(Matcher::equals(9007199254740992i64).evaluate(Some(&nearby)).passed);
    }

    #[test]
    fn one_of_accepts_any_candidate() {
        let matcher = Matcher::one_of(["female", "male"]);
        assert!(matcher.evaluate(Some(&json!("female"))).passed);

        let verdict = matcher.evaluate(Some(&json!("other")));
        assert!(!verdict.passed);
        assert_eq!(
            verdict.message,
            "expected one of [\"female\",\"male\"] but was \"other\""
        );
        assert!(Matcher::one_of([13, 14]).evaluate(Some(&json!(13.0))).passed);
        assert!(!Matcher::one_of(Vec::<Value>::new()).evaluate(Some(&Value::Null)).passed);
    }

    #[test_case(json!(0), true; "zero")]
    #[test_case(json!(""), true; "empty string")]
    #[test_case(json!(false), true; "false")]
    #[test_case(Value::Null, false; "null")]
    fn not_null(value: Value, passed: bool) {
        assert_eq!(Matcher::NotNull.evaluate(Some(&value)).passed, passed);
    }

    #[test_case(json!([1]), true; "non-empty array")]
    #[test_case(json!({"a": 1}), true; "non-empty object")]
    #[test_case(json!([]), false; "empty array")]
    #[test_case(json!({}), false; "empty object")]
    #[test_case(json!("text"), false; "string")]
    #[test_case(Value::Null, false; "null")]
    fn not_empty(value: Value, passed: bool) {
        assert_eq!(Matcher::NotEmpty.evaluate(Some(&value)).passed, passed);
    }

    #[test]
    fn not_empty_message_names_kind() {
        let verdict = Matcher::NotEmpty.evaluate(Some(&json!("text")));
        assert_eq!(
            verdict.message,
            "expected a non-empty array or object but was string"
        );
    }

    #[test_case(Kind::Number, json!(1.5), true; "float is number")]
    #[test_case(Kind::Integer, json!(2), true; "int is integer")]
    #[test_case(Kind::Integer, json!(2.0), true; "whole float is integer")]
    #[test_case(Kind::Integer, json!(2.5), false; "fraction is not integer")]
    #[test_case(Kind::String, json!("a"), true; "string")]
    #[test_case(Kind::Array, json!({}), false; "object is not array")]
    #[test_case(Kind::Null, Value::Null, true; "null")]
    fn is_type(kind: Kind, value: Value, passed: bool) {
        assert_eq!(Matcher::IsType(kind).evaluate(Some(&value)).passed, passed);
    }

    #[test]
    fn kind_parses_lowercase() -> eyre::Result<()> {
        assert_eq!("object".parse::<Kind>()?, Kind::Object);
        assert_eq!(Kind::Integer.to_string(), "integer");
        Ok(())
    }
}
