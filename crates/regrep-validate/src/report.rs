//! Report aggregation.

use regrep_model::{Finding, OverallStatus, ReportCounts, ValidationReport};

/// Merge field and rule findings into a report.
///
/// Failed findings come first, most severe first; passed findings follow.
/// The sort is stable, so findings of equal rank keep package order (fields
/// before rules, each in declaration order).
pub fn aggregate(
    package_id: &str,
    report_type: &str,
    mut findings: Vec<Finding>,
) -> ValidationReport {
    findings.sort_by_key(|finding| (finding.passed, finding.severity.rank()));
    ValidationReport {
        package_id: package_id.to_string(),
        report_type: report_type.to_string(),
        overall_status: OverallStatus::from_findings(&findings),
        counts: ReportCounts::from_findings(&findings),
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regrep_model::{FindingCode, Severity};

    #[test]
    fn orders_failures_by_severity_then_passes() {
        let findings = vec![
            Finding::pass("F1", FindingCode::RequiredPresent, Severity::Error, "ok"),
            Finding::fail("R1", FindingCode::Rule, Severity::Warning, "warn"),
            Finding::fail("F2", FindingCode::MandatoryMissing, Severity::Error, "missing"),
            Finding::fail("F3", FindingCode::RequirementUnresolvable, Severity::Info, "?"),
            Finding::fail("R2", FindingCode::Rule, Severity::Error, "bad"),
        ];
        let report = aggregate("PKG", "TRADE", findings);
        let order: Vec<&str> = report.findings.iter().map(|f| f.subject_id.as_str()).collect();
        assert_eq!(order, ["F2", "R2", "R1", "F3", "F1"]);
        assert_eq!(report.overall_status, OverallStatus::Fail);
        assert_eq!(report.counts.errors, 2);
        assert_eq!(report.counts.mandatory_missing, 1);
    }

    #[test]
    fn empty_report_passes() {
        let report = aggregate("PKG", "TRADE", Vec::new());
        assert_eq!(report.overall_status, OverallStatus::Pass);
        assert_eq!(report.counts, ReportCounts::default());
    }
}
