//! Rule execution.
//!
//! Every rule in scope yields exactly one finding per record. Severity is
//! always the rule's declared severity, except for the INFO findings that
//! mark a rule the engine cannot execute.

use regrep_model::{
    Finding, FindingCode, Record, RegulationPackage, RuleType, Severity, ValidationRuleSpec,
    is_absent, resolve,
};

use crate::batch::{BatchContext, RecordRef};
use crate::catalog::RuleCatalog;
use crate::condition::ConditionEvaluator;
use crate::format::{FormatOutcome, ValidatorKey, ValidatorParams, check, check_enum_value};
use crate::reference::ReferenceDataProvider;
use crate::value::scalar_text;

/// A rule's affected field resolved against a record.
struct AffectedValue<'r> {
    field_id: String,
    path: String,
    value: Option<&'r serde_json::Value>,
}

/// What a populated-value check sees for one affected field.
enum Populated {
    Absent,
    Scalar(String),
    /// An object or array where a single value belongs.
    NonScalar(String),
}

impl AffectedValue<'_> {
    fn populated(&self) -> Populated {
        match self.value {
            _ if is_absent(self.value) => Populated::Absent,
            Some(value) => match scalar_text(value) {
                Some(text) => Populated::Scalar(text),
                None => Populated::NonScalar(value.to_string()),
            },
            None => Populated::Absent,
        }
    }

    fn failure(&self, outcome: FormatOutcome) -> (String, String, FormatOutcome) {
        (self.field_id.clone(), self.path.clone(), outcome)
    }
}

/// Executes a package's validation rules against one record.
#[derive(Clone, Copy)]
pub struct RuleEngine<'a> {
    catalog: &'a RuleCatalog,
    evaluator: ConditionEvaluator,
    reference_data: Option<&'a dyn ReferenceDataProvider>,
}

impl std::fmt::Debug for RuleEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("catalog", self.catalog)
            .field("evaluator", &self.evaluator)
            .field("reference_data", &self.reference_data.is_some())
            .finish()
    }
}

impl<'a> RuleEngine<'a> {
    pub fn new(catalog: &'a RuleCatalog, evaluator: ConditionEvaluator) -> Self {
        Self {
            catalog,
            evaluator,
            reference_data: None,
        }
    }

    #[must_use]
    pub fn with_reference_data(mut self, provider: &'a dyn ReferenceDataProvider) -> Self {
        self.reference_data = Some(provider);
        self
    }

    /// Run every rule of `package` that applies to `report_type`.
    ///
    /// Uniqueness rules need `batch`; without one they are reported as not
    /// automated.
    pub fn run(
        &self,
        package: &RegulationPackage,
        report_type: &str,
        record: &Record,
        batch: Option<(&BatchContext, &RecordRef)>,
    ) -> Vec<Finding> {
        package
            .validation_rules
            .iter()
            .filter(|rule| rule.applies_to(report_type))
            .map(|rule| self.run_rule(package, rule, record, batch))
            .collect()
    }

    /// Run one rule, ignoring its report type scope.
    pub fn run_rule(
        &self,
        package: &RegulationPackage,
        rule: &ValidationRuleSpec,
        record: &Record,
        batch: Option<(&BatchContext, &RecordRef)>,
    ) -> Finding {
        if let Some(precondition) = &rule.applies_when
            && !self.evaluator.evaluate(precondition, record)
        {
            return Finding::pass(
                &rule.rule_id,
                FindingCode::RuleNotTriggered,
                rule.severity,
                "precondition does not hold; rule not triggered",
            );
        }

        let values = affected_values(package, rule, record);
        match rule.rule_type {
            RuleType::Format => self.check_format(rule, &values),
            RuleType::Enum | RuleType::Enumeration => self.check_enumeration(package, rule, &values),
            RuleType::Referential => self.check_referential(rule, &values),
            RuleType::CrossField | RuleType::Business => self.check_assertion(rule, record),
            RuleType::Required => check_required(rule, &values),
            RuleType::Uniqueness => match batch {
                Some((context, record_ref)) => check_uniqueness(rule, &values, context, record_ref),
                None => not_automated(rule, "uniqueness requires a batch context"),
            },
        }
    }

    fn check_format(&self, rule: &ValidationRuleSpec, values: &[AffectedValue<'_>]) -> Finding {
        let validators = self.catalog.validators_for(rule);
        if validators.is_empty() {
            return not_automated(rule, "no format validator is configured for this rule");
        }
        let params = ValidatorParams {
            enum_values: None,
            reference_data: self.reference_data,
        };
        let checked = check_values(values, |text| {
            validators
                .iter()
                .map(|&key| check(key, text, params))
                .find(|outcome| !outcome.valid)
                .unwrap_or_else(FormatOutcome::valid)
        });
        outcome_finding(rule, checked)
    }

    fn check_enumeration(
        &self,
        package: &RegulationPackage,
        rule: &ValidationRuleSpec,
        values: &[AffectedValue<'_>],
    ) -> Finding {
        if let Some(allowed) = self.catalog.enum_values_for(&rule.rule_id) {
            let checked = check_values(values, |text| check_enum_value(text, allowed));
            return outcome_finding(rule, checked);
        }

        // Fall back to the value lists the affected fields declare.
        let declared: Option<Vec<&[String]>> = values
            .iter()
            .map(|value| {
                package
                    .field(&value.field_id)
                    .and_then(|field| field.enum_values.as_deref())
                    .filter(|allowed| !allowed.is_empty())
            })
            .collect();
        match declared {
            Some(lists) if !lists.is_empty() => {
                let mut failures = Vec::new();
                let mut checked = 0;
                for (value, allowed) in values.iter().zip(lists) {
                    let outcome = match value.populated() {
                        Populated::Absent => continue,
                        Populated::Scalar(text) => check_enum_value(&text, allowed),
                        Populated::NonScalar(_) => FormatOutcome::invalid(NOT_SCALAR),
                    };
                    checked += 1;
                    if !outcome.valid {
                        failures.push(value.failure(outcome));
                    }
                }
                outcome_finding(rule, Checked { checked, failures })
            }
            _ => not_automated(rule, "no value list is configured for this rule"),
        }
    }

    fn check_referential(&self, rule: &ValidationRuleSpec, values: &[AffectedValue<'_>]) -> Finding {
        let Some(kind) = self.catalog.referential_kind_for(rule) else {
            return not_automated(rule, "no reference data kind is configured for this rule");
        };
        let Some(provider) = self.reference_data else {
            return not_automated(rule, "no reference data provider is configured");
        };
        let params = ValidatorParams {
            enum_values: None,
            reference_data: Some(provider),
        };
        let key = ValidatorKey::for_reference_kind(kind);
        let checked = check_values(values, |text| check(key, text, params));
        outcome_finding(rule, checked)
    }

    fn check_assertion(&self, rule: &ValidationRuleSpec, record: &Record) -> Finding {
        if let Some(handler) = self.catalog.handler(&rule.rule_id) {
            let outcome = handler.check(rule, record);
            let finding = if outcome.passed {
                Finding::pass(&rule.rule_id, FindingCode::Rule, rule.severity, outcome.message)
            } else {
                Finding::fail(&rule.rule_id, FindingCode::Rule, rule.severity, outcome.message)
            };
            return match outcome.path {
                Some(path) => finding.with_path(path),
                None => finding,
            };
        }
        match &rule.condition_expr {
            Some(assertion) if self.evaluator.evaluate(assertion, record) => Finding::pass(
                &rule.rule_id,
                FindingCode::Rule,
                rule.severity,
                "assertion holds",
            ),
            Some(_) => Finding::fail(
                &rule.rule_id,
                FindingCode::Rule,
                rule.severity,
                format!("{} failed: {}", rule.name, rule.expression),
            ),
            None => not_automated(
                rule,
                "rule has no structured assertion and no registered handler",
            ),
        }
    }
}

/// Outcome of checking the populated affected values.
struct Checked {
    checked: usize,
    failures: Vec<(String, String, FormatOutcome)>,
}

const NOT_SCALAR: &str = "must be a scalar value";

/// Run `validate` on every populated value. Absent values are skipped; the
/// requirement checks report them. Objects and arrays fail without reaching
/// `validate`.
fn check_values(
    values: &[AffectedValue<'_>],
    mut validate: impl FnMut(&str) -> FormatOutcome,
) -> Checked {
    let mut checked = 0;
    let mut failures = Vec::new();
    for value in values {
        let outcome = match value.populated() {
            Populated::Absent => continue,
            Populated::Scalar(text) => validate(&text),
            Populated::NonScalar(_) => FormatOutcome::invalid(NOT_SCALAR),
        };
        checked += 1;
        if !outcome.valid {
            failures.push(value.failure(outcome));
        }
    }
    Checked { checked, failures }
}

fn outcome_finding(rule: &ValidationRuleSpec, checked: Checked) -> Finding {
    let Some((_, first_path, _)) = checked.failures.first() else {
        let message = match checked.checked {
            0 => "no populated values to check".to_string(),
            1 => "1 value checked".to_string(),
            n => format!("{n} values checked"),
        };
        return Finding::pass(&rule.rule_id, FindingCode::Rule, rule.severity, message);
    };
    let path = first_path.clone();
    let message = checked
        .failures
        .iter()
        .map(|(field_id, _, outcome)| {
            format!(
                "{field_id}: {}",
                outcome.reason.as_deref().unwrap_or("invalid value")
            )
        })
        .collect::<Vec<_>>()
        .join("; ");
    Finding::fail(&rule.rule_id, FindingCode::Rule, rule.severity, message).with_path(path)
}

fn check_required(rule: &ValidationRuleSpec, values: &[AffectedValue<'_>]) -> Finding {
    let missing: Vec<&AffectedValue<'_>> = values.iter().filter(|v| is_absent(v.value)).collect();
    match missing.first() {
        None => Finding::pass(
            &rule.rule_id,
            FindingCode::Rule,
            rule.severity,
            "all required values are populated",
        ),
        Some(first) => {
            let ids = missing
                .iter()
                .map(|value| value.field_id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Finding::fail(
                &rule.rule_id,
                FindingCode::Rule,
                rule.severity,
                format!("missing required values: {ids}"),
            )
            .with_path(&first.path)
        }
    }
}

fn check_uniqueness(
    rule: &ValidationRuleSpec,
    values: &[AffectedValue<'_>],
    batch: &BatchContext,
    record_ref: &RecordRef,
) -> Finding {
    let parts: Option<Vec<String>> = values
        .iter()
        .map(|value| match value.populated() {
            Populated::Absent => None,
            Populated::Scalar(text) | Populated::NonScalar(text) => Some(text),
        })
        .collect();
    let Some(parts) = parts.filter(|parts| !parts.is_empty()) else {
        return Finding::pass(
            &rule.rule_id,
            FindingCode::Rule,
            rule.severity,
            "uniqueness key is incomplete; not checked",
        );
    };
    let key = parts.join(", ");
    match batch.register(&rule.rule_id, &parts, record_ref) {
        None => Finding::pass(
            &rule.rule_id,
            FindingCode::Rule,
            rule.severity,
            format!("key {key} is unique so far"),
        ),
        Some(first) => {
            let path = values.last().map(|value| value.path.clone()).unwrap_or_default();
            Finding::fail(
                &rule.rule_id,
                FindingCode::Duplicate,
                rule.severity,
                format!("duplicate key {key}; first seen in record {first}"),
            )
            .with_path(path)
        }
    }
}

fn not_automated(rule: &ValidationRuleSpec, reason: &str) -> Finding {
    Finding::fail(
        &rule.rule_id,
        FindingCode::RuleNotAutomated,
        Severity::Info,
        format!("{} not automated: {reason}", rule.name),
    )
}

/// Resolve a rule's affected fields. A field id maps to the package field's
/// lookup path; anything else is used as a path directly.
fn affected_values<'r>(
    package: &RegulationPackage,
    rule: &ValidationRuleSpec,
    record: &'r Record,
) -> Vec<AffectedValue<'r>> {
    rule.affected_fields
        .iter()
        .map(|field_id| {
            let path = package
                .field(field_id)
                .map_or(field_id.as_str(), |field| field.lookup_path())
                .to_string();
            AffectedValue {
                field_id: field_id.clone(),
                value: resolve(record, &path),
                path,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regrep_model::{ConditionExpression, FieldSpec, Operator, ReportTypeSpec, Requirement};
    use serde_json::json;

    use crate::catalog::RuleOutcome;
    use crate::reference::{InMemoryReferenceData, ReferenceKind};

    fn package() -> RegulationPackage {
        RegulationPackage::new("PKG", "EMIR", "1")
            .with_report_type(ReportTypeSpec::new("TRADE", "Trade"))
            .with_field(
                FieldSpec::new("LEI_1", Requirement::Mandatory).with_path("parties[role=REPORTING].lei"),
            )
            .with_field(
                FieldSpec::new("ACTION", Requirement::Mandatory)
                    .with_path("action_type")
                    .with_enum_values(["NEWT", "MODI"]),
            )
            .with_field(FieldSpec::new("CCY", Requirement::Mandatory).with_path("notional.currency"))
    }

    fn rule(id: &str, rule_type: RuleType, name: &str, fields: &[&str]) -> ValidationRuleSpec {
        ValidationRuleSpec::new(id, rule_type, Severity::Error)
            .with_name(name)
            .with_fields(fields.iter().copied())
    }

    fn record(lei: &str) -> Record {
        json!({
            "action_type": "NEWT",
            "notional": {"currency": "EUR"},
            "parties": [{"role": "REPORTING", "lei": lei}]
        })
    }

    #[test]
    fn format_rule_uses_keyword_validator() {
        let catalog = RuleCatalog::new();
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        let lei_rule = rule("R1", RuleType::Format, "LEI MOD 97-10 check", &["LEI_1"]);

        let ok = engine.run_rule(&package(), &lei_rule, &record("529900T8BM49AURSDO55"), None);
        assert!(ok.passed);
        assert_eq!(ok.message, "1 value checked");

        let bad = engine.run_rule(&package(), &lei_rule, &record("529900T8BM94AURSDO55"), None);
        assert!(bad.is_failure_at(Severity::Error));
        assert_eq!(bad.path.as_deref(), Some("parties[role=REPORTING].lei"));
        assert!(bad.message.starts_with("LEI_1: "), "{}", bad.message);
    }

    #[test]
    fn unmapped_format_rule_is_not_automated() {
        let catalog = RuleCatalog::new();
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        let finding = engine.run_rule(
            &package(),
            &rule("R1", RuleType::Format, "Free text", &["LEI_1"]),
            &record("x"),
            None,
        );
        assert_eq!(finding.code, FindingCode::RuleNotAutomated);
        assert_eq!(finding.severity, Severity::Info);
        assert!(!finding.passed);
    }

    #[test]
    fn enumeration_prefers_catalog_then_field_values() {
        let catalog = RuleCatalog::new().with_enum_values("R1", ["MODI"]);
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        let configured = rule("R1", RuleType::Enumeration, "Action values", &["ACTION"]);
        assert!(!engine.run_rule(&package(), &configured, &record("x"), None).passed);

        let declared = rule("R2", RuleType::Enum, "Action values", &["ACTION"]);
        assert!(engine.run_rule(&package(), &declared, &record("x"), None).passed);

        let unknown = rule("R3", RuleType::Enum, "Currency values", &["CCY"]);
        assert_eq!(
            engine.run_rule(&package(), &unknown, &record("x"), None).code,
            FindingCode::RuleNotAutomated
        );
    }

    #[test]
    fn referential_rule_needs_provider() {
        let catalog = RuleCatalog::new();
        let currency = rule("R1", RuleType::Referential, "Currency (ISO 4217)", &["CCY"]);

        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        assert_eq!(
            engine.run_rule(&package(), &currency, &record("x"), None).code,
            FindingCode::RuleNotAutomated
        );

        let data = InMemoryReferenceData::new().with_codes(ReferenceKind::Currency, ["USD"]);
        let engine = engine.with_reference_data(&data);
        let finding = engine.run_rule(&package(), &currency, &record("x"), None);
        assert!(!finding.passed);
        assert!(finding.message.contains("not a known CURRENCY code"));
    }

    #[test]
    fn assertion_rules_use_handler_or_condition() {
        let catalog = RuleCatalog::new().with_handler("R1", |_: &ValidationRuleSpec, record: &Record| {
            if record["action_type"] == "NEWT" {
                RuleOutcome::fail("new trades are frozen").with_path("action_type")
            } else {
                RuleOutcome::pass("ok")
            }
        });
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());

        let handled = rule("R1", RuleType::Business, "Freeze", &[]);
        let finding = engine.run_rule(&package(), &handled, &record("x"), None);
        assert!(!finding.passed);
        assert_eq!(finding.path.as_deref(), Some("action_type"));

        let asserted = rule("R2", RuleType::CrossField, "Currency set", &[])
            .with_condition_expr(ConditionExpression::exists("notional.currency"));
        assert!(engine.run_rule(&package(), &asserted, &record("x"), None).passed);

        let prose = rule("R3", RuleType::CrossField, "Prose only", &[]);
        assert_eq!(
            engine.run_rule(&package(), &prose, &record("x"), None).code,
            FindingCode::RuleNotAutomated
        );
    }

    #[test]
    fn precondition_gates_rule() {
        let catalog = RuleCatalog::new();
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        let gated = rule("R1", RuleType::Required, "CCP required", &["ccp"])
            .with_applies_when(ConditionExpression::leaf("cleared", Operator::Eq, "Y"));

        let skipped = engine.run_rule(&package(), &gated, &json!({"cleared": "N"}), None);
        assert!(skipped.passed);
        assert_eq!(skipped.code, FindingCode::RuleNotTriggered);

        let failed = engine.run_rule(&package(), &gated, &json!({"cleared": "Y"}), None);
        assert!(!failed.passed);
        assert_eq!(failed.message, "missing required values: ccp");
    }

    #[test]
    fn uniqueness_flags_second_occurrence() {
        let catalog = RuleCatalog::new();
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        let unique = rule("R1", RuleType::Uniqueness, "Unique LEI", &["LEI_1"]);
        let batch = BatchContext::new();

        let first = RecordRef::from(0);
        let second = RecordRef::from(1);
        let lei = "529900T8BM49AURSDO55";
        assert!(engine.run_rule(&package(), &unique, &record(lei), Some((&batch, &first))).passed);
        let duplicate = engine.run_rule(&package(), &unique, &record(lei), Some((&batch, &second)));
        assert_eq!(duplicate.code, FindingCode::Duplicate);
        assert!(duplicate.message.contains("first seen in record #0"));

        let without_batch = engine.run_rule(&package(), &unique, &record(lei), None);
        assert_eq!(without_batch.code, FindingCode::RuleNotAutomated);
    }

    #[test]
    fn object_where_scalar_expected_fails_value_checks() {
        let catalog = RuleCatalog::new();
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        let nested = json!({
            "action_type": ["NEWT"],
            "parties": [{"role": "REPORTING", "lei": {"lei": "529900T8BM49AURSDO55"}}]
        });

        let lei_rule = rule("R1", RuleType::Format, "LEI MOD 97-10 check", &["LEI_1"]);
        let finding = engine.run_rule(&package(), &lei_rule, &nested, None);
        assert!(!finding.passed);
        assert_eq!(finding.message, "LEI_1: must be a scalar value");
        assert_eq!(finding.path.as_deref(), Some("parties[role=REPORTING].lei"));

        let action_rule = rule("R2", RuleType::Enum, "Action values", &["ACTION"]);
        let finding = engine.run_rule(&package(), &action_rule, &nested, None);
        assert!(!finding.passed);
        assert_eq!(finding.message, "ACTION: must be a scalar value");
    }

    #[test]
    fn uniqueness_key_parts_containing_separators_stay_distinct() {
        let catalog = RuleCatalog::new();
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        let unique = rule("R1", RuleType::Uniqueness, "Unique pair", &["a", "b"]);
        let batch = BatchContext::new();

        let first = json!({"a": "x|y", "b": "z"});
        let second = json!({"a": "x", "b": "y|z"});
        let third = json!({"a": "x|y", "b": "z"});
        let run = |record: &Record, index: usize| {
            engine.run_rule(&package(), &unique, record, Some((&batch, &RecordRef::from(index))))
        };
        assert!(run(&first, 0).passed);
        assert!(run(&second, 1).passed);
        let duplicate = run(&third, 2);
        assert_eq!(duplicate.code, FindingCode::Duplicate);
        assert!(duplicate.message.contains("x|y, z"), "{}", duplicate.message);
    }

    #[test]
    fn report_type_scope_filters_rules() {
        let catalog = RuleCatalog::new();
        let engine = RuleEngine::new(&catalog, ConditionEvaluator::default());
        let package = package()
            .with_report_type(ReportTypeSpec::new("MARGIN", "Margin"))
            .with_rule(rule("R1", RuleType::Required, "x", &["CCY"]).with_report_types(["MARGIN"]));
        assert!(engine.run(&package, "TRADE", &record("x"), None).is_empty());
        assert_eq!(engine.run(&package, "MARGIN", &record("x"), None).len(), 1);
    }
}
