//! Record paths.
//!
//! A path is a dot-separated list of segments. A plain segment reads an
//! object key; a filter segment `name[key=value]` reads array `name` and
//! selects the first element whose `key` equals `value`. An index segment
//! `name[n]` reads element `n` of array `name`:
//!
//! ```text
//! counterparty_1.lei
//! parties[role=REPORTING].lei
//! parties[0].lei
//! ```
//!
//! Resolution never fails: a missing key, a type mismatch, or a filter with
//! no match all resolve to `None`.

use std::fmt;

use serde_json::Value;

use crate::error::{ModelError, Result};

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// First element of array `name` whose `key` equals `value`.
    Filter {
        name: String,
        key: String,
        value: String,
    },
    /// Element `index` of array `name`.
    Index { name: String, index: usize },
}

/// A parsed record path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a path, rejecting malformed filter and index syntax.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |message: &str| ModelError::InvalidPath {
            path: raw.to_string(),
            message: message.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        let mut rest = trimmed;
        loop {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let name = rest[..end].trim();
            if name.is_empty() {
                return Err(invalid("empty segment"));
            }
            rest = &rest[end..];

            if let Some(after_bracket) = rest.strip_prefix('[') {
                let Some(close) = after_bracket.find(']') else {
                    return Err(invalid("unclosed '['"));
                };
                let filter = &after_bracket[..close];
                let segment = match filter.split_once('=') {
                    Some((key, value)) => {
                        let key = key.trim();
                        if key.is_empty() {
                            return Err(invalid("filter key is empty"));
                        }
                        PathSegment::Filter {
                            name: name.to_string(),
                            key: key.to_string(),
                            value: value.trim().to_string(),
                        }
                    }
                    None => match filter.trim().parse::<usize>() {
                        Ok(index) => PathSegment::Index {
                            name: name.to_string(),
                            index,
                        },
                        Err(_) => {
                            return Err(invalid("filter must have the form [key=value] or [n]"));
                        }
                    },
                };
                segments.push(segment);
                rest = &after_bracket[close + 1..];
            } else {
                segments.push(PathSegment::Key(name.to_string()));
            }

            if rest.is_empty() {
                break;
            }
            match rest.strip_prefix('.') {
                Some(next) => rest = next,
                None => return Err(invalid("expected '.' after ']'")),
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Read the value at this path. Explicit JSON `null` resolves to
    /// `Some(Value::Null)`; use [`is_absent`] for presence semantics.
    pub fn resolve<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        let mut current = record;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Key(name) => current.as_object()?.get(name)?,
                PathSegment::Filter { name, key, value } => current
                    .as_object()?
                    .get(name)?
                    .as_array()?
                    .iter()
                    .find(|element| filter_matches(element, key, value))?,
                PathSegment::Index { name, index } => {
                    current.as_object()?.get(name)?.as_array()?.get(*index)?
                }
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn filter_matches(element: &Value, key: &str, expected: &str) -> bool {
    match element.as_object().and_then(|object| object.get(key)) {
        Some(Value::String(actual)) => actual == expected,
        Some(Value::Number(actual)) => actual.to_string() == expected,
        Some(Value::Bool(actual)) => actual.to_string() == expected,
        _ => false,
    }
}

/// Resolve `path` against `record`. A malformed path resolves to `None`.
pub fn resolve<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    FieldPath::parse(path).ok()?.resolve(record)
}

/// Absent, `null`, or a blank string.
pub fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "action_type": "NEWT",
            "notional": {"amount": 1000000, "currency": "EUR"},
            "parties": [
                {"role": "REPORTING", "lei": "529900T8BM49AURSDO55"},
                {"role": "OTHER", "lei": "5493001KJTIIGC8Y1R12"},
                {"role": "BROKER", "lei": null},
                {"seq": 2, "lei": "SECOND"}
            ],
            "cleared": false,
            "blank": "  "
        })
    }

    #[test]
    fn resolves_dotted_paths() {
        let record = record();
        assert_eq!(resolve(&record, "action_type"), Some(&json!("NEWT")));
        assert_eq!(resolve(&record, "notional.amount"), Some(&json!(1000000)));
        assert_eq!(resolve(&record, "notional.missing"), None);
        assert_eq!(resolve(&record, "action_type.deeper"), None);
    }

    #[test]
    fn resolves_filter_segments() {
        let record = record();
        assert_eq!(
            resolve(&record, "parties[role=REPORTING].lei"),
            Some(&json!("529900T8BM49AURSDO55"))
        );
        assert_eq!(
            resolve(&record, "parties[seq=2].lei"),
            Some(&json!("SECOND"))
        );
        assert_eq!(resolve(&record, "parties[role=CCP].lei"), None);
        assert_eq!(resolve(&record, "notional[role=REPORTING].lei"), None);
    }

    #[test]
    fn resolves_index_segments() {
        let record = record();
        assert_eq!(resolve(&record, "parties[1].lei"), Some(&json!("5493001KJTIIGC8Y1R12")));
        assert_eq!(resolve(&record, "parties[ 0 ].role"), Some(&json!("REPORTING")));
        assert_eq!(resolve(&record, "parties[9].lei"), None);
        assert_eq!(resolve(&record, "notional[0]"), None);

        let path = FieldPath::parse("parties[3].lei").unwrap();
        assert_eq!(
            path.segments()[0],
            PathSegment::Index {
                name: "parties".to_string(),
                index: 3,
            }
        );
        assert!(FieldPath::parse("parties[-1].lei").is_err());
        assert!(FieldPath::parse("parties[0]lei").is_err());
    }

    #[test]
    fn null_and_blank_count_as_absent() {
        let record = record();
        assert!(is_absent(resolve(&record, "parties[role=BROKER].lei")));
        assert!(is_absent(resolve(&record, "blank")));
        assert!(is_absent(resolve(&record, "nope")));
        assert!(!is_absent(resolve(&record, "cleared")));
    }

    #[test]
    fn rejects_malformed_paths() {
        for raw in ["", "a..b", "parties[role=X", "parties[role]", "parties[=X]", "a[k=v]b", ".a"] {
            assert!(FieldPath::parse(raw).is_err(), "{raw:?} should be rejected");
        }
        assert_eq!(resolve(&record(), "parties[role=X"), None);
    }

    #[test]
    fn parses_segments() {
        let path = FieldPath::parse("trade.parties[role=REPORTING].lei").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("trade".to_string()),
                PathSegment::Filter {
                    name: "parties".to_string(),
                    key: "role".to_string(),
                    value: "REPORTING".to_string(),
                },
                PathSegment::Key("lei".to_string()),
            ]
        );
        assert_eq!(path.to_string(), "trade.parties[role=REPORTING].lei");
    }
}
