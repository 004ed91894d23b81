//! Regulation packages.

use serde::{Deserialize, Serialize};

use crate::field::FieldSpec;
use crate::rule::ValidationRuleSpec;

/// A sub-category of a package, e.g. TRADE or POSITION.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTypeSpec {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReportTypeSpec {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// Declarative specification of one regulation's reportable fields and rules.
///
/// `field_count` and `validation_rule_count` are summary metadata carried for
/// display. They can drift from the arrays and are never used for behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationPackage {
    pub package_id: String,
    pub regulation_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    pub version: String,
    pub report_types: Vec<ReportTypeSpec>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub validation_rules: Vec<ValidationRuleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rule_count: Option<usize>,
}

impl RegulationPackage {
    pub fn new(
        package_id: impl Into<String>,
        regulation_code: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            regulation_code: regulation_code.into(),
            name: String::new(),
            jurisdiction: None,
            version: version.into(),
            report_types: Vec::new(),
            fields: Vec::new(),
            validation_rules: Vec::new(),
            field_count: None,
            validation_rule_count: None,
        }
    }

    #[must_use]
    pub fn with_report_type(mut self, report_type: ReportTypeSpec) -> Self {
        self.report_types.push(report_type);
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: ValidationRuleSpec) -> Self {
        self.validation_rules.push(rule);
        self
    }

    /// Look up a field by id.
    pub fn field(&self, field_id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.field_id == field_id)
    }

    /// Look up a rule by id.
    pub fn rule(&self, rule_id: &str) -> Option<&ValidationRuleSpec> {
        self.validation_rules
            .iter()
            .find(|rule| rule.rule_id == rule_id)
    }

    /// Look up a report type by code (case-insensitive).
    pub fn report_type(&self, code: &str) -> Option<&ReportTypeSpec> {
        self.report_types
            .iter()
            .find(|report_type| report_type.code.eq_ignore_ascii_case(code.trim()))
    }

    /// Whether the declared summary counters agree with the arrays.
    pub fn declared_counts_match(&self) -> bool {
        self.field_count.is_none_or(|count| count == self.fields.len())
            && self
                .validation_rule_count
                .is_none_or(|count| count == self.validation_rules.len())
    }
}
