//! Error types for validation setup and condition evaluation.

use std::path::PathBuf;

use regrep_standards::StandardsError;
use thiserror::Error;

/// Errors raised before a record is validated.
///
/// A failed check is never an error; it becomes a
/// [`Finding`](regrep_model::Finding).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidateError {
    /// Report type resolution or package lookup failed.
    #[error(transparent)]
    Standards(#[from] StandardsError),

    /// Catalog or reference data file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog or reference data JSON could not be decoded.
    #[error("Failed to decode {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for validation setup.
pub type Result<T> = std::result::Result<T, ValidateError>;

/// Reasons a condition could not be evaluated.
///
/// [`ConditionEvaluator::evaluate`](crate::ConditionEvaluator::evaluate)
/// turns these into `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("condition nesting exceeds the maximum depth of {max_depth}")]
    DepthExceeded { max_depth: usize },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}
