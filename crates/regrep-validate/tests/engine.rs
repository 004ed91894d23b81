//! End-to-end validation against the bundled packages.

use chrono::DateTime;
use serde_json::{Value, json};

use regrep_model::{
    FindingCode, OverallStatus, Record, RegulationPackage, Severity, ValidationReport,
    ValidationRuleSpec,
};
use regrep_standards::{PackageRegistry, StandardsError};
use regrep_validate::{
    InMemoryReferenceData, ReferenceKind, RuleCatalog, RuleOutcome, ValidateError,
    ValidationContext, validate_record,
};

fn registry() -> PackageRegistry {
    PackageRegistry::embedded().expect("embedded packages load")
}

fn emir(registry: &PackageRegistry) -> &RegulationPackage {
    registry.find("EMIR").expect("EMIR package")
}

fn trade() -> Record {
    json!({
        "reporting_timestamp": "2024-03-01T12:00:00Z",
        "parties": [
            {"role": "SUBMITTING", "lei": "549300MLUDYVRQOOXS22"},
            {"role": "REPORTING", "lei": "529900T8BM49AURSDO55"},
            {"role": "OTHER", "lei": "5493001KJTIIGC8Y1R12"},
            {"role": "CCP", "lei": "213800D1EI4B9WTWWD28"}
        ],
        "counterparty_1": {"nature": "F", "sector": "INVF"},
        "direction": "BYER",
        "uti": "529900T8BM49AURSDO55TRADE0001",
        "isin": "US0378331005",
        "cleared": "Y",
        "venue_of_execution": "XLON",
        "notional": {"currency": "EUR", "amount": 1000000},
        "execution_timestamp": "2024-03-01T10:15:00Z",
        "effective_date": "2024-03-01",
        "expiration_date": "2025-03-01",
        "action_type": "NEWT"
    })
}

fn with(mut record: Record, pointer: &str, value: Value) -> Record {
    *record.pointer_mut(pointer).expect("pointer exists") = value;
    record
}

fn finding<'r>(report: &'r ValidationReport, subject: &str) -> &'r regrep_model::Finding {
    report
        .findings
        .iter()
        .find(|finding| finding.subject_id == subject)
        .unwrap_or_else(|| panic!("no finding for {subject}"))
}

fn failed_subjects(report: &ValidationReport, severity: Severity) -> Vec<&str> {
    report
        .findings
        .iter()
        .filter(|finding| finding.is_failure_at(severity) && finding.severity == severity)
        .map(|finding| finding.subject_id.as_str())
        .collect()
}

#[test]
fn valid_trade_passes_with_informational_findings() {
    let registry = registry();
    let report = validate_record(emir(&registry), Some("TRADE"), &trade(), &ValidationContext::new())
        .expect("validates");

    assert_eq!(report.package_id, "EMIR_REFIT");
    assert_eq!(report.report_type, "TRADE");
    assert_eq!(report.overall_status, OverallStatus::Pass);
    insta::assert_json_snapshot!(report.counts, @r#"
    {
      "mandatory_missing": 0,
      "conditional_unresolved": 2,
      "errors": 0,
      "warnings": 0,
      "infos": 7
    }
    "#);

    let mut informational = failed_subjects(&report, Severity::Info);
    informational.sort_unstable();
    assert_eq!(
        informational,
        [
            "EMIR_004",
            "EMIR_020",
            "EMIR_VR_004",
            "EMIR_VR_006",
            "EMIR_VR_007",
            "EMIR_VR_008",
            "EMIR_VR_009"
        ]
    );
    assert_eq!(finding(&report, "EMIR_VR_001").message, "2 values checked");
    assert_eq!(finding(&report, "EMIR_VR_012").message, "1 value checked");
}

#[test]
fn failures_lead_the_report() {
    let registry = registry();
    let report = validate_record(emir(&registry), Some("TRADE"), &trade(), &ValidationContext::new())
        .expect("validates");
    let first_pass = report
        .findings
        .iter()
        .position(|finding| finding.passed)
        .expect("some findings pass");
    assert!(report.findings[..first_pass].iter().all(|finding| !finding.passed));
    assert!(report.findings[first_pass..].iter().all(|finding| finding.passed));
}

#[test]
fn sector_is_unresolvable_whatever_the_nature() {
    let registry = registry();
    let package = emir(&registry);
    for nature in ["F", "N"] {
        let record = with(trade(), "/counterparty_1/nature", json!(nature));
        let report = validate_record(package, Some("TRADE"), &record, &ValidationContext::new())
            .expect("validates");
        let sector = finding(&report, "EMIR_004");
        assert_eq!(sector.code, FindingCode::RequirementUnresolvable);
        assert_eq!(sector.severity, Severity::Info);
        assert!(sector.message.contains("Required when Nature = F"));
    }
}

#[test]
fn event_date_required_for_modifications() {
    let registry = registry();
    let package = emir(&registry);
    let record = with(trade(), "/action_type", json!("MODI"));

    let report = validate_record(package, Some("TRADE"), &record, &ValidationContext::new())
        .expect("validates");
    assert_eq!(report.overall_status, OverallStatus::Fail);
    let event_date = finding(&report, "EMIR_022");
    assert_eq!(event_date.code, FindingCode::ConditionalMissing);
    assert_eq!(event_date.path.as_deref(), Some("event_date"));
    assert_eq!(report.findings[0].subject_id, "EMIR_022");

    let mut record = record;
    record["event_date"] = json!("2024-03-02");
    let report = validate_record(package, Some("TRADE"), &record, &ValidationContext::new())
        .expect("validates");
    assert_eq!(report.overall_status, OverallStatus::Pass);
    assert!(finding(&report, "EMIR_022").passed);
}

#[test]
fn missing_mandatory_field_fails() {
    let registry = registry();
    let mut record = trade();
    record
        .as_object_mut()
        .expect("object record")
        .remove("uti");
    let report = validate_record(emir(&registry), Some("TRADE"), &record, &ValidationContext::new())
        .expect("validates");
    assert_eq!(report.overall_status, OverallStatus::Fail);
    assert_eq!(report.counts.mandatory_missing, 1);
    assert_eq!(finding(&report, "EMIR_010").code, FindingCode::MandatoryMissing);
    assert_eq!(finding(&report, "EMIR_VR_012").message, "no populated values to check");
}

#[test]
fn transposed_lei_digits_fail_the_checksum() {
    let registry = registry();
    let record = with(trade(), "/parties/1/lei", json!("529900T8BM94AURSDO55"));
    let report = validate_record(emir(&registry), Some("TRADE"), &record, &ValidationContext::new())
        .expect("validates");

    assert_eq!(report.overall_status, OverallStatus::Fail);
    assert_eq!(failed_subjects(&report, Severity::Error), ["EMIR_VR_001"]);
    let checksum = finding(&report, "EMIR_VR_001");
    assert_eq!(checksum.path.as_deref(), Some("parties[role=REPORTING].lei"));
    assert!(checksum.message.starts_with("EMIR_005: "), "{}", checksum.message);
    // The pattern alone accepts the transposed value.
    assert!(finding(&report, "EMIR_005").passed);
}

#[test]
fn bad_isin_check_digit_fails() {
    let registry = registry();
    let record = with(trade(), "/isin", json!("US0378331006"));
    let report = validate_record(emir(&registry), Some("TRADE"), &record, &ValidationContext::new())
        .expect("validates");
    assert_eq!(failed_subjects(&report, Severity::Error), ["EMIR_VR_002"]);
}

#[test]
fn uncleared_trade_skips_ccp_rule() {
    let registry = registry();
    let mut record = with(trade(), "/cleared", json!("N"));
    record["parties"]
        .as_array_mut()
        .expect("parties array")
        .retain(|party| party["role"] != "CCP");
    let report = validate_record(emir(&registry), Some("TRADE"), &record, &ValidationContext::new())
        .expect("validates");
    assert_eq!(report.overall_status, OverallStatus::Pass);
    let ccp = finding(&report, "EMIR_VR_003");
    assert!(ccp.passed);
    assert_eq!(ccp.code, FindingCode::RuleNotTriggered);
    assert!(report.findings.iter().all(|finding| finding.subject_id != "EMIR_014"));
}

#[test]
fn cleared_trade_without_ccp_fails_field_and_rule() {
    let registry = registry();
    let mut record = trade();
    record["parties"]
        .as_array_mut()
        .expect("parties array")
        .retain(|party| party["role"] != "CCP");
    let report = validate_record(emir(&registry), Some("TRADE"), &record, &ValidationContext::new())
        .expect("validates");
    assert_eq!(failed_subjects(&report, Severity::Error), ["EMIR_014", "EMIR_VR_003"]);
}

#[test]
fn report_type_scope_excludes_fields_and_rules() {
    let registry = registry();
    let package = emir(&registry);
    let report = validate_record(package, Some("VALUATION"), &trade(), &ValidationContext::new())
        .expect("validates");

    for subject in ["EMIR_008", "EMIR_015", "EMIR_VR_002", "EMIR_VR_007"] {
        assert!(
            report.findings.iter().all(|finding| finding.subject_id != subject),
            "{subject} is out of scope for VALUATION"
        );
    }
    assert_eq!(failed_subjects(&report, Severity::Error), [
        "EMIR_030",
        "EMIR_031",
        "EMIR_032",
        "EMIR_VR_010"
    ]);

    let margin = json!({"collateral": {"portfolio_code": "PORTFOLIO1"}});
    let report = validate_record(package, Some("margin"), &margin, &ValidationContext::new());
    let report = report.expect("report type codes are case-insensitive");
    assert_eq!(report.report_type, "MARGIN");
}

#[test]
fn report_type_resolution() {
    let registry = registry();
    let error = validate_record(emir(&registry), None, &trade(), &ValidationContext::new())
        .expect_err("EMIR declares several report types");
    assert!(matches!(
        error,
        ValidateError::Standards(StandardsError::ReportTypeRequired { .. })
    ));

    let error = validate_record(emir(&registry), Some("SWAP"), &trade(), &ValidationContext::new())
        .expect_err("SWAP is not declared");
    assert!(matches!(
        error,
        ValidateError::Standards(StandardsError::UnknownReportType { .. })
    ));

    let mifir = registry.find("MIFIR").expect("MiFIR package");
    let report = validate_record(mifir, None, &json!({}), &ValidationContext::new())
        .expect("single report type is implied");
    assert_eq!(report.report_type, "TRANSACTION");
    assert_eq!(report.overall_status, OverallStatus::Fail);
}

#[test]
fn validation_is_idempotent() {
    let registry = registry();
    let package = emir(&registry);
    let record = with(trade(), "/action_type", json!("CORR"));
    let ctx = ValidationContext::new();

    let first = validate_record(package, Some("TRADE"), &record, &ctx).expect("validates");
    let second = validate_record(package, Some("TRADE"), &record, &ctx).expect("validates");
    assert_eq!(
        serde_json::to_string(&first).expect("serializes"),
        serde_json::to_string(&second).expect("serializes")
    );
}

fn reference_data() -> InMemoryReferenceData {
    InMemoryReferenceData::new()
        .with_codes(ReferenceKind::Currency, ["EUR", "USD", "GBP"])
        .with_codes(ReferenceKind::Mic, ["XLON", "XXXX", "XOFF"])
}

#[test]
fn unknown_venue_is_a_warning() {
    let registry = registry();
    let data = reference_data();
    let ctx = ValidationContext::new().with_reference_data(&data);

    let report = validate_record(emir(&registry), Some("TRADE"), &trade(), &ctx).expect("validates");
    assert_eq!(report.overall_status, OverallStatus::Pass);
    assert!(finding(&report, "EMIR_VR_006").passed);
    assert!(finding(&report, "EMIR_VR_007").passed);
    assert_eq!(report.counts.infos, 5);

    let record = with(trade(), "/venue_of_execution", json!("XPAR"));
    let report = validate_record(emir(&registry), Some("TRADE"), &record, &ctx).expect("validates");
    assert_eq!(report.overall_status, OverallStatus::Warn);
    assert_eq!(failed_subjects(&report, Severity::Warning), ["EMIR_VR_007"]);
    assert_eq!(report.counts.warnings, 1);
}

#[test]
fn registered_handler_runs_business_rule() {
    let registry = registry();
    let catalog = RuleCatalog::new().with_handler(
        "EMIR_VR_009",
        |_: &ValidationRuleSpec, record: &Record| {
            let parse = |path: &str| {
                record[path]
                    .as_str()
                    .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            };
            match (parse("reporting_timestamp"), parse("execution_timestamp")) {
                (Some(reported), Some(executed)) if reported < executed => {
                    RuleOutcome::fail("reported before execution").with_path("reporting_timestamp")
                }
                _ => RuleOutcome::pass("reporting follows execution"),
            }
        },
    );
    let ctx = ValidationContext::new().with_catalog(&catalog);

    let report = validate_record(emir(&registry), Some("TRADE"), &trade(), &ctx).expect("validates");
    assert!(finding(&report, "EMIR_VR_009").passed);
    assert_eq!(report.counts.infos, 6);

    let record = with(trade(), "/reporting_timestamp", json!("2024-03-01T09:00:00Z"));
    let report = validate_record(emir(&registry), Some("TRADE"), &record, &ctx).expect("validates");
    let timing = finding(&report, "EMIR_VR_009");
    assert!(timing.is_failure_at(Severity::Error));
    assert_eq!(timing.code, FindingCode::Rule);
    assert_eq!(timing.path.as_deref(), Some("reporting_timestamp"));
    assert_eq!(report.overall_status, OverallStatus::Fail);
}

#[test]
fn non_positive_notional_fails_business_rule() {
    let registry = registry();
    let record = with(trade(), "/notional/amount", json!(0));
    let report = validate_record(emir(&registry), Some("TRADE"), &record, &ValidationContext::new())
        .expect("validates");
    let notional = finding(&report, "EMIR_VR_011");
    assert!(!notional.passed);
    assert!(notional.message.contains("Positive notional"));
}

#[test]
fn mifir_country_check_is_a_warning() {
    let registry = registry();
    let mifir = registry.find("MIFIR_TRANSACTIONS").expect("MiFIR by id");
    let rule = mifir.rule("MIFIR_VR_008").expect("country rule");
    assert_eq!(rule.severity, Severity::Warning);
}
