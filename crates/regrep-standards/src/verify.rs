//! Load-time shape checks for regulation packages.
//!
//! Decoding already guarantees that every condition node has exactly one
//! discriminant. These checks cover what serde cannot see: regex syntax,
//! path syntax, and references between report types, fields and rules.

use std::collections::BTreeSet;

use regex::Regex;

use regrep_model::{
    ConditionExpression, FieldPath, RegulationPackage, Requirement, ValidationRuleSpec,
};

use crate::error::{Result, StandardsError};

/// Reject a package whose shape is internally inconsistent.
pub fn verify_package(package: &RegulationPackage) -> Result<()> {
    let id = package.package_id.as_str();
    if id.trim().is_empty() {
        return Err(StandardsError::configuration(
            "<unnamed>",
            "package_id",
            "package_id is blank",
        ));
    }
    if package.regulation_code.trim().is_empty() {
        return Err(StandardsError::configuration(
            id,
            "regulation_code",
            "regulation_code is blank",
        ));
    }

    let report_types = verify_report_types(package)?;

    let mut field_ids = BTreeSet::new();
    for (idx, field) in package.fields.iter().enumerate() {
        let location = format!("fields[{idx}] ({})", field.field_id);
        if field.field_id.trim().is_empty() {
            return Err(StandardsError::configuration(
                id,
                location,
                "field_id is blank",
            ));
        }
        if !field_ids.insert(field.field_id.as_str()) {
            tracing::warn!(package = id, field = %field.field_id, "duplicate field id");
        }
        FieldPath::parse(field.lookup_path())
            .map_err(|e| StandardsError::configuration(id, &location, e))?;
        if let Some(pattern) = &field.pattern {
            Regex::new(pattern).map_err(|e| {
                StandardsError::configuration(id, format!("{location}.pattern"), e)
            })?;
        }
        if let (Some(min), Some(max)) = (field.min_length, field.max_length)
            && min > max
        {
            return Err(StandardsError::configuration(
                id,
                location,
                format!("min_length {min} exceeds max_length {max}"),
            ));
        }
        verify_scope(id, &location, field.report_types.as_deref(), &report_types)?;
        if let Some(expr) = &field.condition_expr {
            verify_condition(id, &format!("{location}.condition_expr"), expr)?;
        }
    }

    let mut rule_ids = BTreeSet::new();
    for (idx, rule) in package.validation_rules.iter().enumerate() {
        let location = format!("validation_rules[{idx}] ({})", rule.rule_id);
        if rule.rule_id.trim().is_empty() {
            return Err(StandardsError::configuration(
                id,
                location,
                "rule_id is blank",
            ));
        }
        if !rule_ids.insert(rule.rule_id.as_str()) {
            tracing::warn!(package = id, rule = %rule.rule_id, "duplicate rule id");
        }
        verify_rule(id, &location, rule, &report_types)?;
    }

    if !package.declared_counts_match() {
        tracing::debug!(
            package = id,
            declared_fields = ?package.field_count,
            actual_fields = package.fields.len(),
            declared_rules = ?package.validation_rule_count,
            actual_rules = package.validation_rules.len(),
            "declared counts differ from package contents"
        );
    }

    let unresolvable = package
        .fields
        .iter()
        .filter(|field| {
            field.requirement == Requirement::Conditional && field.condition_expr.is_none()
        })
        .count();
    if unresolvable > 0 {
        tracing::debug!(
            package = id,
            count = unresolvable,
            "conditional fields without a structured condition"
        );
    }

    Ok(())
}

fn verify_report_types(package: &RegulationPackage) -> Result<BTreeSet<String>> {
    let id = package.package_id.as_str();
    if package.report_types.is_empty() {
        return Err(StandardsError::configuration(
            id,
            "report_types",
            "package declares no report types",
        ));
    }
    let mut codes = BTreeSet::new();
    for (idx, report_type) in package.report_types.iter().enumerate() {
        let code = report_type.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(StandardsError::configuration(
                id,
                format!("report_types[{idx}]"),
                "report type code is blank",
            ));
        }
        if !codes.insert(code) {
            return Err(StandardsError::configuration(
                id,
                format!("report_types[{idx}]"),
                format!("duplicate report type '{}'", report_type.code),
            ));
        }
    }
    Ok(codes)
}

fn verify_scope(
    id: &str,
    location: &str,
    scope: Option<&[String]>,
    declared: &BTreeSet<String>,
) -> Result<()> {
    for code in scope.unwrap_or_default() {
        if !declared.contains(&code.trim().to_uppercase()) {
            return Err(StandardsError::configuration(
                id,
                format!("{location}.report_types"),
                format!("unknown report type '{code}'"),
            ));
        }
    }
    Ok(())
}

fn verify_rule(
    id: &str,
    location: &str,
    rule: &ValidationRuleSpec,
    report_types: &BTreeSet<String>,
) -> Result<()> {
    verify_scope(id, location, rule.report_types.as_deref(), report_types)?;
    for field in &rule.affected_fields {
        FieldPath::parse(field).map_err(|e| {
            StandardsError::configuration(id, format!("{location}.affected_fields"), e)
        })?;
    }
    if let Some(expr) = &rule.condition_expr {
        verify_condition(id, &format!("{location}.condition_expr"), expr)?;
    }
    if let Some(expr) = &rule.applies_when {
        verify_condition(id, &format!("{location}.applies_when"), expr)?;
    }
    Ok(())
}

fn verify_condition(id: &str, location: &str, expr: &ConditionExpression) -> Result<()> {
    let mut result = Ok(());
    expr.for_each_leaf(&mut |leaf| {
        if result.is_err() {
            return;
        }
        if let Err(e) = FieldPath::parse(&leaf.field) {
            result = Err(StandardsError::configuration(id, location, e));
            return;
        }
        if let Some(pattern) = leaf.pattern()
            && let Err(e) = Regex::new(pattern)
        {
            result = Err(StandardsError::configuration(id, location, e));
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use regrep_model::{FieldSpec, Operator, ReportTypeSpec, RuleType, Severity};

    fn package() -> RegulationPackage {
        RegulationPackage::new("PKG", "EMIR", "1")
            .with_report_type(ReportTypeSpec::new("TRADE", "Trade"))
            .with_report_type(ReportTypeSpec::new("POSITION", "Position"))
    }

    fn config_message(result: Result<()>) -> String {
        match result {
            Err(StandardsError::Configuration { message, .. }) => message,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_consistent_package() {
        let pkg = package()
            .with_field(
                FieldSpec::new("F1", Requirement::Mandatory)
                    .with_path("parties[role=REPORTING].lei")
                    .with_pattern("^[A-Z0-9]{20}$")
                    .with_report_types(["trade"]),
            )
            .with_rule(
                ValidationRuleSpec::new("R1", RuleType::CrossField, Severity::Error)
                    .with_fields(["F1"])
                    .with_condition_expr(ConditionExpression::leaf(
                        "lei",
                        Operator::Matches,
                        "^[A-Z]+$",
                    )),
            );
        verify_package(&pkg).unwrap();
    }

    #[test]
    fn rejects_missing_report_types() {
        let pkg = RegulationPackage::new("PKG", "EMIR", "1");
        assert!(config_message(verify_package(&pkg)).contains("no report types"));
    }

    #[test]
    fn rejects_bad_field_pattern() {
        let pkg =
            package().with_field(FieldSpec::new("F1", Requirement::Optional).with_pattern("(["));
        let err = verify_package(&pkg).unwrap_err().to_string();
        assert!(err.contains("fields[0] (F1).pattern"), "{err}");
    }

    #[test]
    fn rejects_unknown_report_type_scope() {
        let pkg = package().with_field(
            FieldSpec::new("F1", Requirement::Optional).with_report_types(["MARGIN"]),
        );
        assert!(config_message(verify_package(&pkg)).contains("unknown report type 'MARGIN'"));
    }

    #[test]
    fn rejects_inverted_lengths() {
        let pkg = package()
            .with_field(FieldSpec::new("F1", Requirement::Optional).with_length(Some(5), Some(2)));
        assert!(config_message(verify_package(&pkg)).contains("min_length 5 exceeds"));
    }

    #[test]
    fn rejects_bad_condition_regex_and_path() {
        let pkg = package().with_field(FieldSpec::new("F1", Requirement::Conditional).with_condition_expr(
            ConditionExpression::leaf("code", Operator::Matches, "(unclosed"),
        ));
        assert!(verify_package(&pkg).is_err());

        let pkg = package().with_rule(
            ValidationRuleSpec::new("R1", RuleType::Business, Severity::Warning)
                .with_applies_when(ConditionExpression::exists("parties[role")),
        );
        let err = verify_package(&pkg).unwrap_err().to_string();
        assert!(err.contains("applies_when"), "{err}");
    }

    #[test]
    fn duplicate_rule_ids_are_tolerated() {
        let rule = ValidationRuleSpec::new("R1", RuleType::Format, Severity::Error);
        let pkg = package().with_rule(rule.clone()).with_rule(rule);
        verify_package(&pkg).unwrap();
    }
}
