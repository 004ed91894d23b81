//! Evaluation findings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Finding severity, as declared by the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "warning")]
    Warning,
    #[serde(alias = "info")]
    Info,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }

    /// Sort rank; most severe first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(ModelError::UnknownValue {
                kind: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// What kind of check produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCode {
    // Requirement checks
    /// Mandatory field has no value.
    MandatoryMissing,
    /// Conditional field is required for this record but has no value.
    ConditionalMissing,
    /// Required field is populated.
    RequiredPresent,
    /// Conditional field has no structured condition to evaluate.
    RequirementUnresolvable,

    // Field constraints
    Pattern,
    MaxLength,
    MinLength,
    EnumValue,

    // Rules
    /// A rule that was executed.
    Rule,
    /// A rule with no machine-checkable shape or handler.
    RuleNotAutomated,
    /// A rule whose precondition did not hold.
    RuleNotTriggered,
    /// A uniqueness key already seen in the batch.
    Duplicate,
}

impl FindingCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MandatoryMissing => "mandatory_missing",
            Self::ConditionalMissing => "conditional_missing",
            Self::RequiredPresent => "required_present",
            Self::RequirementUnresolvable => "requirement_unresolvable",
            Self::Pattern => "pattern",
            Self::MaxLength => "max_length",
            Self::MinLength => "min_length",
            Self::EnumValue => "enum_value",
            Self::Rule => "rule",
            Self::RuleNotAutomated => "rule_not_automated",
            Self::RuleNotTriggered => "rule_not_triggered",
            Self::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pass/fail outcome for a field or rule against one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// `field_id` or `rule_id`.
    pub subject_id: String,
    pub code: FindingCode,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Finding {
    pub fn pass(
        subject_id: impl Into<String>,
        code: FindingCode,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            code,
            severity,
            passed: true,
            message: message.into(),
            path: None,
        }
    }

    pub fn fail(
        subject_id: impl Into<String>,
        code: FindingCode,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            passed: false,
            ..Self::pass(subject_id, code, severity, message)
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// A failed finding at the given severity.
    pub fn is_failure_at(&self, severity: Severity) -> bool {
        !self.passed && self.severity == severity
    }
}
