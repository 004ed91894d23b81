//! Validation report types.

use serde::{Deserialize, Serialize};

use crate::finding::{Finding, FindingCode, Severity};

/// Overall outcome of one record's validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Pass,
    Warn,
    Fail,
}

impl OverallStatus {
    /// FAIL on any failed ERROR, WARN on any failed WARNING, else PASS.
    pub fn from_findings(findings: &[Finding]) -> Self {
        if findings.iter().any(|f| f.is_failure_at(Severity::Error)) {
            Self::Fail
        } else if findings.iter().any(|f| f.is_failure_at(Severity::Warning)) {
            Self::Warn
        } else {
            Self::Pass
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }
}

/// Roll-up counts over a report's findings.
///
/// `errors`, `warnings` and `infos` count failed findings only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub mandatory_missing: usize,
    pub conditional_unresolved: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl ReportCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.code {
                FindingCode::MandatoryMissing => counts.mandatory_missing += 1,
                FindingCode::RequirementUnresolvable => counts.conditional_unresolved += 1,
                _ => {}
            }
            if finding.passed {
                continue;
            }
            match finding.severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.infos += 1,
            }
        }
        counts
    }
}

/// Validation outcome for one record against one package and report type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub package_id: String,
    pub report_type: String,
    pub overall_status: OverallStatus,
    pub findings: Vec<Finding>,
    pub counts: ReportCounts,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.overall_status == OverallStatus::Fail
    }

    /// Failed findings, in report order.
    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|finding| !finding.passed)
    }

    /// Findings for one field or rule id.
    pub fn findings_for<'a>(&'a self, subject_id: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings
            .iter()
            .filter(move |finding| finding.subject_id == subject_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(severity: Severity) -> Finding {
        Finding::fail("F1", FindingCode::Rule, severity, "failed")
    }

    #[test]
    fn status_follows_worst_failed_severity() {
        assert_eq!(OverallStatus::from_findings(&[]), OverallStatus::Pass);
        assert_eq!(
            OverallStatus::from_findings(&[failed(Severity::Error)]),
            OverallStatus::Fail
        );
        assert_eq!(
            OverallStatus::from_findings(&[failed(Severity::Warning), failed(Severity::Info)]),
            OverallStatus::Warn
        );
        assert_eq!(
            OverallStatus::from_findings(&[failed(Severity::Info)]),
            OverallStatus::Pass
        );
    }

    #[test]
    fn passed_findings_never_change_status() {
        let findings = vec![
            Finding::pass("R1", FindingCode::Rule, Severity::Error, "ok"),
            Finding::pass("R2", FindingCode::Rule, Severity::Warning, "ok"),
        ];
        assert_eq!(OverallStatus::from_findings(&findings), OverallStatus::Pass);
    }

    #[test]
    fn counts_split_by_code_and_severity() {
        let findings = vec![
            Finding::fail("F1", FindingCode::MandatoryMissing, Severity::Error, "missing"),
            Finding::fail(
                "F2",
                FindingCode::RequirementUnresolvable,
                Severity::Info,
                "unresolvable",
            ),
            Finding::fail("R1", FindingCode::Rule, Severity::Warning, "warn"),
            Finding::pass("R2", FindingCode::Rule, Severity::Error, "ok"),
        ];
        let counts = ReportCounts::from_findings(&findings);
        assert_eq!(
            counts,
            ReportCounts {
                mandatory_missing: 1,
                conditional_unresolved: 1,
                errors: 1,
                warnings: 1,
                infos: 1,
            }
        );
    }
}
