//! Field paths into structured response bodies.
//!
//! A path is a sequence of object keys and array indices written in the
//! familiar dot/bracket notation:
//!
//! ```text
//! users[0].email       -> Key("users"), Index(0), Key("email")
//! products[-1].title   -> Key("products"), Index(-1), Key("title")
//! [2].id               -> Index(2), Key("id")
//! ```
//!
//! Negative indices count from the end of the array. Resolution yields
//! `None` when any segment is missing, which is distinct from resolving to
//! an explicit `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: impl Into<String>) -> Result<FieldPath> {
        let raw = raw.into();
        let segments = parse_segments(&raw).map_err(|reason| Error::InvalidPath {
            path: raw.clone(),
            reason,
        })?;
        Ok(FieldPath { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk the path through `root`. Returns `None` if the path does not exist.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |value, segment| match (segment, value) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => {
                    let len = items.len() as i64;
                    let index = if *index < 0 { len + index } else { *index };
                    if (0..len).contains(&index) {
                        items.get(index as usize)
                    } else {
                        None
                    }
                }
                _ => None,
            })
    }
}

fn parse_segments(raw: &str) -> std::result::Result<Vec<Segment>, String> {
    if raw.trim().is_empty() {
        return Err("path is empty".into());
    }

    let mut segments = Vec::new();
    let mut chars = raw.chars().peekable();
    let mut key = String::new();
    // Set after a closing bracket, where only '.', '[' or end of input may follow.
    let mut after_index = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if key.is_empty() && !after_index {
                    return Err("empty key segment".into());
                }
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                after_index = false;
                if chars.peek().is_none() {
                    return Err("path ends with '.'".into());
                }
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) => digits.push(d),
                        None => return Err("unclosed '['".into()),
                    }
                }
                let index = digits
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| format!("invalid array index \"{digits}\""))?;
                segments.push(Segment::Index(index));
                after_index = true;
            }
            ']' => return Err("unexpected ']'".into()),
            c => {
                if after_index {
                    return Err(format!("unexpected '{c}' after index"));
                }
                key.push(c);
            }
        }
    }

    if !key.is_empty() {
        segments.push(Segment::Key(key));
    }

    Ok(segments)
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<FieldPath> {
        FieldPath::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = Error;

    fn try_from(s: String) -> Result<FieldPath> {
        FieldPath::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = Error;

    fn try_from(s: &str) -> Result<FieldPath> {
        FieldPath::parse(s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> String {
        path.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    fn body() -> Value {
        json!({
            "users": [
                {"id": 1, "email": "emily.johnson@x.dummyjson.com", "address": null},
                {"id": 2, "email": "michael.williams@x.dummyjson.com"}
            ],
            "total": 2,
        })
    }

    #[test]
    fn parse_mixed_segments() -> eyre::Result<()> {
        let path = FieldPath::parse("users[0].email")?;
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("users".into()),
                Segment::Index(0),
                Segment::Key("email".into())
            ]
        );
        Ok(())
    }

    #[test]
    fn parse_consecutive_indices() -> eyre::Result<()> {
        let path = FieldPath::parse("matrix[1][-2]")?;
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("matrix".into()),
                Segment::Index(1),
                Segment::Index(-2)
            ]
        );
        Ok(())
    }

    #[test_case(""; "empty")]
    #[test_case("   "; "blank")]
    #[test_case("users..email"; "double dot")]
    #[test_case(".users"; "leading dot")]
    #[test_case("users."; "trailing dot")]
    #[test_case("users[0"; "unclosed bracket")]
    #[test_case("users[x]"; "non numeric index")]
    #[test_case("users]"; "stray bracket")]
    #[test_case("users[0]email"; "key glued to index")]
    fn parse_rejects_malformed(raw: &str) {
        assert!(matches!(
            FieldPath::parse(raw),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test_case("users[0].email", Some(json!("emily.johnson@x.dummyjson.com")); "nested")]
    #[test_case("users[-1].id", Some(json!(2)); "negative index")]
    #[test_case("total", Some(json!(2)); "top level")]
    #[test_case("users[0].address", Some(Value::Null); "explicit null")]
    #[test_case("users[5].email", None; "index out of range")]
    #[test_case("users[-3].email", None; "negative out of range")]
    #[test_case("users[1].address", None; "missing key")]
    #[test_case("total.value", None; "key on scalar")]
    #[test_case("users.email", None; "key on array")]
    fn resolve(raw: &str, expected: Option<Value>) -> eyre::Result<()> {
        let body = body();
        let path = FieldPath::parse(raw)?;
        assert_eq!(path.resolve(&body), expected.as_ref());
        Ok(())
    }

    #[test]
    fn display_keeps_raw_text() -> eyre::Result<()> {
        let path: FieldPath = "users[0].firstName".parse()?;
        assert_eq!(path.to_string(), "users[0].firstName");
        Ok(())
    }
}
