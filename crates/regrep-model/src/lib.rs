//! Regulation package data model.
//!
//! These types mirror the declarative package format: a [`RegulationPackage`]
//! lists reportable [`FieldSpec`]s and [`ValidationRuleSpec`]s, each optionally
//! guarded by a structured [`ConditionExpression`]. Evaluating them produces
//! [`Finding`]s that roll up into a [`ValidationReport`].
//!
//! The model is inert: nothing here resolves paths or evaluates conditions.
//! That is the job of `regrep-validate`.

pub mod condition;
pub mod error;
pub mod field;
pub mod finding;
pub mod package;
pub mod path;
pub mod report;
pub mod rule;

pub use condition::{ConditionExpression, ConditionLeaf, Operator};
pub use error::{ModelError, Result};
pub use field::{FieldSpec, Requirement};
pub use finding::{Finding, FindingCode, Severity};
pub use package::{RegulationPackage, ReportTypeSpec};
pub use path::{FieldPath, PathSegment, is_absent, resolve};
pub use report::{OverallStatus, ReportCounts, ValidationReport};
pub use rule::{RuleType, ValidationRuleSpec};

/// A semi-structured transaction or position record.
///
/// Records are plain JSON values; path resolution defines the only contract
/// a record has to satisfy.
pub type Record = serde_json::Value;
