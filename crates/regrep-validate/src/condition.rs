//! Condition expression evaluation.

use serde_json::Value;

use regrep_model::{ConditionExpression, ConditionLeaf, Operator, is_absent, resolve};

use crate::error::EvaluationError;
use crate::pattern::compiled;
use crate::value::{compare, loosely_equal, scalar_text};

/// Default maximum nesting depth for condition trees.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Evaluates [`ConditionExpression`] trees against a record.
///
/// Stateless apart from its depth limit, so one evaluator can be shared
/// freely between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionEvaluator {
    max_depth: usize,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl ConditionEvaluator {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Evaluate `expr`, failing closed.
    ///
    /// A tree deeper than the limit, or a `matches` leaf whose pattern does
    /// not compile, evaluates to `false` and logs a warning.
    pub fn evaluate(&self, expr: &ConditionExpression, record: &Value) -> bool {
        match self.try_evaluate(expr, record) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, "condition evaluation failed; treating as false");
                false
            }
        }
    }

    /// Evaluate `expr`, reporting why evaluation was impossible.
    pub fn try_evaluate(
        &self,
        expr: &ConditionExpression,
        record: &Value,
    ) -> Result<bool, EvaluationError> {
        self.evaluate_at(expr, record, 1)
    }

    fn evaluate_at(
        &self,
        expr: &ConditionExpression,
        record: &Value,
        depth: usize,
    ) -> Result<bool, EvaluationError> {
        if depth > self.max_depth {
            return Err(EvaluationError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        match expr {
            ConditionExpression::Leaf(leaf) => evaluate_leaf(leaf, record),
            ConditionExpression::And(children) => {
                for child in children {
                    if !self.evaluate_at(child, record, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ConditionExpression::Or(children) => {
                for child in children {
                    if self.evaluate_at(child, record, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ConditionExpression::Not(inner) => Ok(!self.evaluate_at(inner, record, depth + 1)?),
        }
    }
}

fn evaluate_leaf(leaf: &ConditionLeaf, record: &Value) -> Result<bool, EvaluationError> {
    // Null and blank strings are absent for every operator, not just `exists`.
    let actual = resolve(record, &leaf.field).filter(|value| !is_absent(Some(*value)));

    match leaf.operator {
        Operator::Exists => Ok(actual.is_some()),
        Operator::NotExists => Ok(actual.is_none()),
        Operator::Eq | Operator::Ne | Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
            let (Some(actual), Some(expected)) = (actual, leaf.value.as_ref()) else {
                return Ok(leaf.operator == Operator::Ne);
            };
            let ordering = compare(actual, expected);
            Ok(match leaf.operator {
                Operator::Eq => ordering.is_some_and(|o| o.is_eq()),
                Operator::Ne => !ordering.is_some_and(|o| o.is_eq()),
                Operator::Gt => ordering.is_some_and(|o| o.is_gt()),
                Operator::Lt => ordering.is_some_and(|o| o.is_lt()),
                Operator::Gte => ordering.is_some_and(|o| o.is_ge()),
                Operator::Lte => ordering.is_some_and(|o| o.is_le()),
                _ => false,
            })
        }
        Operator::In | Operator::NotIn => {
            let Some(actual) = actual else {
                return Ok(leaf.operator == Operator::NotIn);
            };
            let found = leaf
                .value
                .as_ref()
                .and_then(Value::as_array)
                .is_some_and(|members| members.iter().any(|member| loosely_equal(actual, member)));
            Ok(found == (leaf.operator == Operator::In))
        }
        Operator::Matches => {
            let Some(pattern) = leaf.pattern() else {
                return Ok(false);
            };
            let Some(text) = actual.and_then(scalar_text) else {
                return Ok(false);
            };
            let regex = compiled(pattern).map_err(|e| EvaluationError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            Ok(regex.is_match(&text))
        }
    }
}
