//! Validation rule specifications.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::condition::ConditionExpression;
use crate::error::ModelError;
use crate::finding::Severity;

/// Kind of check a rule describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Format,
    CrossField,
    Business,
    Enum,
    Enumeration,
    Referential,
    Uniqueness,
    Required,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::CrossField => "cross_field",
            Self::Business => "business",
            Self::Enum => "enum",
            Self::Enumeration => "enumeration",
            Self::Referential => "referential",
            Self::Uniqueness => "uniqueness",
            Self::Required => "required",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "format" => Ok(Self::Format),
            "cross_field" => Ok(Self::CrossField),
            "business" => Ok(Self::Business),
            "enum" => Ok(Self::Enum),
            "enumeration" => Ok(Self::Enumeration),
            "referential" => Ok(Self::Referential),
            "uniqueness" => Ok(Self::Uniqueness),
            "required" => Ok(Self::Required),
            other => Err(ModelError::UnknownValue {
                kind: "rule type",
                value: other.to_string(),
            }),
        }
    }
}

/// A validation rule declared by a package.
///
/// `expression` is documentation. Only the structured predicates
/// (`condition_expr`, `applies_when`) are ever evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRuleSpec {
    pub rule_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub severity: Severity,
    pub rule_type: RuleType,
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub affected_fields: Vec<String>,
    /// Assertion checked by `cross_field` and `business` rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_expr: Option<ConditionExpression>,
    /// Precondition; when it evaluates false the rule is not triggered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_when: Option<ConditionExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_types: Option<Vec<String>>,
}

impl ValidationRuleSpec {
    pub fn new(rule_id: impl Into<String>, rule_type: RuleType, severity: Severity) -> Self {
        let rule_id = rule_id.into();
        Self {
            name: rule_id.clone(),
            rule_id,
            description: None,
            severity,
            rule_type,
            expression: String::new(),
            affected_fields: Vec::new(),
            condition_expr: None,
            applies_when: None,
            report_types: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_condition_expr(mut self, expr: ConditionExpression) -> Self {
        self.condition_expr = Some(expr);
        self
    }

    #[must_use]
    pub fn with_applies_when(mut self, expr: ConditionExpression) -> Self {
        self.applies_when = Some(expr);
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

    /// Whether the rule applies to the given report type code.
    pub fn applies_to(&self, report_type: &str) -> bool {
        match &self.report_types {
            Some(codes) if !codes.is_empty() => codes
                .iter()
                .any(|code| code.trim().eq_ignore_ascii_case(report_type.trim())),
            _ => true,
        }
    }

    /// Text used to map a rule to a validator: name, description, expression.
    pub fn descriptive_text(&self) -> String {
        let mut text = self.name.clone();
        if let Some(description) = &self.description {
            text.push(' ');
            text.push_str(description);
        }
        text.push(' ');
        text.push_str(&self.expression);
        text
    }
}
