//! Type-aware comparison of record values.
//!
//! Numbers compare numerically, date-like strings compare as instants, and
//! everything else falls back to a lexical comparison of the scalar text.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// String form of a scalar. Objects, arrays and `null` have none.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Order two values, or `None` when they are not comparable.
pub fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    if let (Some(left), Some(right)) = (as_number(actual), as_number(expected))
        && (actual.is_number() || expected.is_number())
    {
        return left.partial_cmp(&right);
    }

    match (actual, expected) {
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        (Value::String(left), Value::String(right)) => {
            match (parse_temporal(left), parse_temporal(right)) {
                (Some(left), Some(right)) => Some(left.cmp(&right)),
                _ => Some(left.trim().cmp(right.trim())),
            }
        }
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            (actual == expected).then_some(Ordering::Equal)
        }
        _ => {
            let left = scalar_text(actual)?;
            let right = scalar_text(expected)?;
            Some(left.trim().cmp(right.trim()))
        }
    }
}

/// Equality under [`compare`]: `1` equals `"1"` and `1.0`, `"Y"` equals `"Y"`.
pub fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    compare(actual, expected) == Some(Ordering::Equal)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Parse an ISO-8601 date or date-time. Offsets are normalised to UTC; a bare
/// date is midnight.
pub fn parse_temporal(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.len() < 10 {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.naive_utc());
    }
    if let Ok(local) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(local);
    }
    if let Ok(local) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M") {
        return Some(local);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(compare(&json!(10), &json!(9)), Some(Ordering::Greater));
        assert_eq!(compare(&json!("10"), &json!(9)), Some(Ordering::Greater));
        assert!(loosely_equal(&json!(1), &json!(1.0)));
        assert!(loosely_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn numeric_strings_compare_lexically() {
        // Identifiers like "0010" are text unless one side is a JSON number.
        assert_eq!(compare(&json!("10"), &json!("9")), Some(Ordering::Less));
    }

    #[test]
    fn dates_compare_as_instants() {
        assert_eq!(
            compare(&json!("2024-03-01T10:00:00+01:00"), &json!("2024-03-01T09:30:00Z")),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare(&json!("2024-03-02"), &json!("2024-03-01T23:59:59Z")),
            Some(Ordering::Greater)
        );
        assert!(loosely_equal(&json!("2024-03-01"), &json!("2024-03-01T00:00:00Z")));
    }

    #[test]
    fn mixed_scalars_compare_as_text() {
        assert!(loosely_equal(&json!(true), &json!("true")));
        assert!(!loosely_equal(&json!({"a": 1}), &json!("a")));
        assert!(loosely_equal(&json!(["X"]), &json!(["X"])));
    }

    #[test]
    fn parse_temporal_rejects_non_dates() {
        assert!(parse_temporal("NEWT").is_none());
        assert!(parse_temporal("2024-13-01").is_none());
        assert!(parse_temporal("529900T8BM49AURSDO55").is_none());
    }
}
