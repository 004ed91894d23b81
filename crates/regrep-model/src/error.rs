//! Error types for package shape problems.

use thiserror::Error;

use crate::condition::Operator;

/// Shape errors detected while decoding package data.
///
/// Any of these rejects the whole package at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A condition node carries none of `field`, `and`, `or`, `not`.
    #[error("condition node has no discriminant (expected one of field, and, or, not)")]
    EmptyCondition,

    /// A condition node carries more than one discriminant.
    #[error("condition node mixes discriminants: {keys}")]
    AmbiguousCondition { keys: String },

    /// An `and`/`or` node with an empty operand list.
    #[error("'{combinator}' condition has no operands")]
    EmptyCombinator { combinator: &'static str },

    /// A leaf without an operator.
    #[error("condition on '{field}' has no operator")]
    MissingOperator { field: String },

    /// A leaf with a blank field path.
    #[error("condition leaf has an empty field path")]
    EmptyField,

    /// A comparison leaf without a comparison value.
    #[error("operator '{operator}' on '{field}' requires a value")]
    MissingValue { field: String, operator: Operator },

    /// `in`/`not_in` with a non-array value.
    #[error("operator '{operator}' on '{field}' requires an array value")]
    ExpectedArray { field: String, operator: Operator },

    /// `matches` with a non-string value.
    #[error("operator 'matches' on '{field}' requires a string pattern")]
    ExpectedPattern { field: String },

    /// `operator`/`value` keys on a combinator node.
    #[error("'{key}' is only valid on a field condition")]
    StrayLeafKey { key: &'static str },

    /// A record path with malformed syntax.
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// An enum-like string that matches no known variant.
    #[error("unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
