//! Structured condition expressions.
//!
//! A [`ConditionExpression`] is a tree of boolean predicates. On the wire each
//! node is a JSON object discriminated by which key it carries:
//!
//! ```json
//! { "field": "action_type", "operator": "in", "value": ["MODI", "CORR"] }
//! { "and": [ ... ] }
//! { "or": [ ... ] }
//! { "not": { ... } }
//! ```
//!
//! Exactly one of `field`, `and`, `or`, `not` must be present. Decoding
//! rejects anything else with a [`ModelError`], so a loaded expression is
//! always well formed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Predicate operators for a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    NotIn,
    Exists,
    NotExists,
    Matches,
}

impl Operator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
            Self::Matches => "matches",
        }
    }

    /// Ordered or equality comparison against a single value.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Gt | Self::Lt | Self::Gte | Self::Lte
        )
    }

    /// Set membership against an array value.
    pub fn is_membership(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Presence test; the leaf value is ignored.
    pub fn is_presence(&self) -> bool {
        matches!(self, Self::Exists | Self::NotExists)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "gte" => Ok(Self::Gte),
            "lte" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            "not_in" => Ok(Self::NotIn),
            "exists" => Ok(Self::Exists),
            "not_exists" => Ok(Self::NotExists),
            "matches" => Ok(Self::Matches),
            other => Err(ModelError::UnknownValue {
                kind: "operator",
                value: other.to_string(),
            }),
        }
    }
}

/// A leaf predicate: `field <operator> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionLeaf {
    /// Record path, e.g. `parties[role=REPORTING].lei`.
    pub field: String,
    pub operator: Operator,
    /// Comparison value. `None` only for `exists`/`not_exists`.
    pub value: Option<Value>,
}

impl ConditionLeaf {
    /// Regex source for a `matches` leaf.
    pub fn pattern(&self) -> Option<&str> {
        match (self.operator, &self.value) {
            (Operator::Matches, Some(Value::String(pattern))) => Some(pattern),
            _ => None,
        }
    }
}

/// A boolean predicate tree over a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum ConditionExpression {
    Leaf(ConditionLeaf),
    And(Vec<ConditionExpression>),
    Or(Vec<ConditionExpression>),
    Not(Box<ConditionExpression>),
}

impl ConditionExpression {
    /// Build a leaf with a comparison value.
    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Leaf(ConditionLeaf {
            field: field.into(),
            operator,
            value: Some(value.into()),
        })
    }

    /// `exists` leaf.
    pub fn exists(field: impl Into<String>) -> Self {
        Self::Leaf(ConditionLeaf {
            field: field.into(),
            operator: Operator::Exists,
            value: None,
        })
    }

    /// `not_exists` leaf.
    pub fn not_exists(field: impl Into<String>) -> Self {
        Self::Leaf(ConditionLeaf {
            field: field.into(),
            operator: Operator::NotExists,
            value: None,
        })
    }

    /// Negate an expression.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: ConditionExpression) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Nesting depth; a single leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::And(children) | Self::Or(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::Not(inner) => 1 + inner.depth(),
        }
    }

    /// Visit every leaf in document order.
    pub fn for_each_leaf<'a>(&'a self, visit: &mut impl FnMut(&'a ConditionLeaf)) {
        match self {
            Self::Leaf(leaf) => visit(leaf),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.for_each_leaf(visit);
                }
            }
            Self::Not(inner) => inner.for_each_leaf(visit),
        }
    }

    /// All record paths referenced by the tree, in document order.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.for_each_leaf(&mut |leaf| fields.push(leaf.field.as_str()));
        fields
    }
}

/// Wire shape of a condition node before discriminant checks.
#[derive(Serialize, Deserialize)]
struct RawCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    and: Option<Vec<ConditionExpression>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    or: Option<Vec<ConditionExpression>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    not: Option<Box<ConditionExpression>>,
}

impl TryFrom<RawCondition> for ConditionExpression {
    type Error = ModelError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let present: Vec<&str> = [
            ("field", raw.field.is_some()),
            ("and", raw.and.is_some()),
            ("or", raw.or.is_some()),
            ("not", raw.not.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, set)| set.then_some(key))
        .collect();

        match present.as_slice() {
            [] => Err(ModelError::EmptyCondition),
            [_] => {
                if let Some(field) = raw.field {
                    return build_leaf(field, raw.operator, raw.value);
                }
                if raw.operator.is_some() {
                    return Err(ModelError::StrayLeafKey { key: "operator" });
                }
                if raw.value.is_some() {
                    return Err(ModelError::StrayLeafKey { key: "value" });
                }
                if let Some(children) = raw.and {
                    if children.is_empty() {
                        return Err(ModelError::EmptyCombinator { combinator: "and" });
                    }
                    return Ok(Self::And(children));
                }
                if let Some(children) = raw.or {
                    if children.is_empty() {
                        return Err(ModelError::EmptyCombinator { combinator: "or" });
                    }
                    return Ok(Self::Or(children));
                }
                match raw.not {
                    Some(inner) => Ok(Self::Not(inner)),
                    None => Err(ModelError::EmptyCondition),
                }
            }
            keys => Err(ModelError::AmbiguousCondition {
                keys: keys.join(", "),
            }),
        }
    }
}

fn build_leaf(
    field: String,
    operator: Option<Operator>,
    value: Option<Value>,
) -> Result<ConditionExpression, ModelError> {
    if field.trim().is_empty() {
        return Err(ModelError::EmptyField);
    }
    let Some(operator) = operator else {
        return Err(ModelError::MissingOperator { field });
    };
    // `"value": null` decodes to None, which is what presence tests expect.
    let value = value.filter(|v| !v.is_null());
    if operator.is_comparison() && value.is_none() {
        return Err(ModelError::MissingValue { field, operator });
    }
    if operator.is_membership() && !matches!(value, Some(Value::Array(_))) {
        return Err(ModelError::ExpectedArray { field, operator });
    }
    if operator == Operator::Matches && !matches!(value, Some(Value::String(_))) {
        return Err(ModelError::ExpectedPattern { field });
    }
    Ok(ConditionExpression::Leaf(ConditionLeaf {
        field,
        operator,
        value: if operator.is_presence() { None } else { value },
    }))
}

impl From<ConditionExpression> for RawCondition {
    fn from(expr: ConditionExpression) -> Self {
        let mut raw = RawCondition {
            field: None,
            operator: None,
            value: None,
            and: None,
            or: None,
            not: None,
        };
        match expr {
            ConditionExpression::Leaf(leaf) => {
                raw.field = Some(leaf.field);
                raw.operator = Some(leaf.operator);
                raw.value = leaf.value;
            }
            ConditionExpression::And(children) => raw.and = Some(children),
            ConditionExpression::Or(children) => raw.or = Some(children),
            ConditionExpression::Not(inner) => raw.not = Some(inner),
        }
        raw
    }
}
