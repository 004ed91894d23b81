//! Reportable field specifications.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::condition::ConditionExpression;
use crate::error::ModelError;

/// Declared requirement status of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    #[serde(alias = "M")]
    Mandatory,
    #[serde(alias = "C")]
    Conditional,
    #[serde(alias = "O")]
    Optional,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mandatory => "mandatory",
            Self::Conditional => "conditional",
            Self::Optional => "optional",
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Requirement {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mandatory" | "m" => Ok(Self::Mandatory),
            "conditional" | "c" => Ok(Self::Conditional),
            "optional" | "o" => Ok(Self::Optional),
            other => Err(ModelError::UnknownValue {
                kind: "requirement",
                value: other.to_string(),
            }),
        }
    }
}

/// One reportable field of a regulation package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub requirement: Requirement,
    /// Human-readable condition. Advisory only; never evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Machine-evaluable condition for `conditional` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_expr: Option<ConditionExpression>,
    /// Path of the value inside a record. Falls back to `field_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdm_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Report types the field applies to. Absent or empty means all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_types: Option<Vec<String>>,
}

impl FieldSpec {
    /// Create a field with no constraints.
    pub fn new(field_id: impl Into<String>, requirement: Requirement) -> Self {
        let field_id = field_id.into();
        Self {
            name: field_id.clone(),
            field_id,
            description: None,
            category: None,
            data_type: None,
            requirement,
            condition: None,
            condition_expr: None,
            cdm_path: None,
            pattern: None,
            max_length: None,
            min_length: None,
            enum_values: None,
            report_types: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.cdm_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, text: impl Into<String>) -> Self {
        self.condition = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_condition_expr(mut self, expr: ConditionExpression) -> Self {
        self.condition_expr = Some(expr);
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    #[must_use]
    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_report_types<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.report_types = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Record path used to read this field's value.
    pub fn lookup_path(&self) -> &str {
        self.cdm_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .unwrap_or(&self.field_id)
    }

    /// Whether the field applies to the given report type code.
    pub fn applies_to(&self, report_type: &str) -> bool {
        match &self.report_types {
            Some(codes) if !codes.is_empty() => codes
                .iter()
                .any(|code| code.trim().eq_ignore_ascii_case(report_type.trim())),
            _ => true,
        }
    }

    /// Whether any value-level constraint is declared.
    pub fn has_format_constraints(&self) -> bool {
        self.pattern.is_some()
            || self.max_length.is_some()
            || self.min_length.is_some()
            || self.enum_values.as_ref().is_some_and(|values| !values.is_empty())
    }
}
