//! Field requirement resolution and field-level findings.

use std::fmt;

use serde_json::Value;

use regrep_model::{
    FieldSpec, Finding, FindingCode, Record, Requirement, Severity, is_absent, resolve,
};

use crate::condition::ConditionEvaluator;
use crate::format::check_enum_value;
use crate::pattern::compiled;
use crate::value::scalar_text;

/// Whether a field must be populated for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredState {
    Required,
    NotRequired,
    /// Conditional field without a structured condition.
    Unresolvable,
}

/// Requirement of a field for one record and report type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectiveRequirement {
    /// The field is scoped to other report types.
    NotApplicable,
    Mandatory,
    ConditionalRequired,
    ConditionalNotRequired,
    Unresolvable,
    Optional,
}

impl EffectiveRequirement {
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Self::NotApplicable)
    }

    pub fn required(&self) -> RequiredState {
        match self {
            Self::Mandatory | Self::ConditionalRequired => RequiredState::Required,
            Self::Unresolvable => RequiredState::Unresolvable,
            Self::NotApplicable | Self::ConditionalNotRequired | Self::Optional => {
                RequiredState::NotRequired
            }
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotApplicable => "field does not apply to this report type",
            Self::Mandatory => "field is mandatory",
            Self::ConditionalRequired => "condition holds",
            Self::ConditionalNotRequired => "condition does not hold",
            Self::Unresolvable => "conditional field has no structured condition",
            Self::Optional => "field is optional",
        }
    }
}

impl fmt::Display for EffectiveRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Computes effective requirements and field-level findings.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldResolver {
    evaluator: ConditionEvaluator,
}

impl FieldResolver {
    pub fn new(evaluator: ConditionEvaluator) -> Self {
        Self { evaluator }
    }

    /// Effective requirement of `field` for `report_type` and `record`.
    pub fn resolve_requirement(
        &self,
        field: &FieldSpec,
        report_type: &str,
        record: &Record,
    ) -> EffectiveRequirement {
        if !field.applies_to(report_type) {
            return EffectiveRequirement::NotApplicable;
        }
        match field.requirement {
            Requirement::Mandatory => EffectiveRequirement::Mandatory,
            Requirement::Optional => EffectiveRequirement::Optional,
            Requirement::Conditional => match &field.condition_expr {
                Some(expr) if self.evaluator.evaluate(expr, record) => {
                    EffectiveRequirement::ConditionalRequired
                }
                Some(_) => EffectiveRequirement::ConditionalNotRequired,
                None => EffectiveRequirement::Unresolvable,
            },
        }
    }

    /// Requirement and format findings for one field.
    ///
    /// Fields scoped to other report types produce nothing. A populated
    /// value is checked against the field's own constraints; only
    /// violations produce constraint findings.
    pub fn check_field(&self, field: &FieldSpec, report_type: &str, record: &Record) -> Vec<Finding> {
        let requirement = self.resolve_requirement(field, report_type, record);
        if !requirement.is_applicable() {
            return Vec::new();
        }

        let path = field.lookup_path();
        let value = resolve(record, path);
        let present = !is_absent(value);
        let mut findings = Vec::new();

        match (requirement.required(), present) {
            (RequiredState::Required, false) => {
                let (code, message) = if requirement == EffectiveRequirement::Mandatory {
                    (
                        FindingCode::MandatoryMissing,
                        format!("{} is mandatory but has no value", label(field)),
                    )
                } else {
                    (
                        FindingCode::ConditionalMissing,
                        format!(
                            "{} is required because its condition holds, but has no value",
                            label(field)
                        ),
                    )
                };
                findings.push(
                    Finding::fail(&field.field_id, code, Severity::Error, message).with_path(path),
                );
            }
            (RequiredState::Required, true) => {
                findings.push(
                    Finding::pass(
                        &field.field_id,
                        FindingCode::RequiredPresent,
                        Severity::Error,
                        format!("{} is populated ({requirement})", label(field)),
                    )
                    .with_path(path),
                );
            }
            (RequiredState::Unresolvable, _) => {
                let condition = field
                    .condition
                    .as_deref()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .unwrap_or("no condition given");
                findings.push(
                    Finding::fail(
                        &field.field_id,
                        FindingCode::RequirementUnresolvable,
                        Severity::Info,
                        format!(
                            "{} is conditional but its requirement cannot be evaluated: {condition}",
                            label(field)
                        ),
                    )
                    .with_path(path),
                );
            }
            (RequiredState::NotRequired, _) => {}
        }

        if present && let Some(value) = value {
            findings.extend(check_constraints(field, value));
        }
        findings
    }
}

fn label(field: &FieldSpec) -> String {
    if field.name.is_empty() || field.name == field.field_id {
        field.field_id.clone()
    } else {
        format!("{} ({})", field.field_id, field.name)
    }
}

/// Violations of a field's pattern, length and enum constraints.
fn check_constraints(field: &FieldSpec, value: &Value) -> Vec<Finding> {
    if !field.has_format_constraints() {
        return Vec::new();
    }
    let path = field.lookup_path();
    let fail = |code: FindingCode, message: String| {
        Finding::fail(&field.field_id, code, Severity::Error, message).with_path(path)
    };

    let Some(text) = scalar_text(value) else {
        return vec![fail(
            FindingCode::Pattern,
            format!("{} must be a scalar value", field.field_id),
        )];
    };
    let text = text.trim();
    let mut findings = Vec::new();

    if let Some(pattern) = &field.pattern {
        match compiled(pattern) {
            Ok(regex) if !regex.is_match(text) => findings.push(fail(
                FindingCode::Pattern,
                format!("'{text}' does not match pattern {pattern}"),
            )),
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(field = %field.field_id, %pattern, %error, "skipping invalid field pattern");
            }
        }
    }

    let length = text.chars().count();
    if let Some(max) = field.max_length
        && length > max
    {
        findings.push(fail(
            FindingCode::MaxLength,
            format!("length {length} exceeds maximum {max}"),
        ));
    }
    if let Some(min) = field.min_length
        && length < min
    {
        findings.push(fail(
            FindingCode::MinLength,
            format!("length {length} is below minimum {min}"),
        ));
    }

    if let Some(allowed) = field.enum_values.as_deref().filter(|values| !values.is_empty()) {
        let outcome = check_enum_value(text, allowed);
        if let Some(reason) = outcome.reason.filter(|_| !outcome.valid) {
            findings.push(fail(FindingCode::EnumValue, reason));
        }
    }

    findings
}
