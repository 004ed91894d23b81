//! Input loading and batch validation for the `validate` command.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, info_span};

use regrep_model::{OverallStatus, Record, RegulationPackage, ValidationReport};
use regrep_standards::PackageRegistry;
use regrep_validate::{
    BatchContext, InMemoryReferenceData, RecordRef, RuleCatalog, ValidationContext,
    validate_record_in_batch,
};

/// Report for one input record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub record: RecordRef,
    pub report: ValidationReport,
}

/// Reports for every record of one input file.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub package_id: String,
    pub report_type: String,
    pub records: Vec<RecordOutcome>,
}

impl BatchResult {
    pub fn has_failures(&self) -> bool {
        self.records
            .iter()
            .any(|outcome| outcome.report.overall_status == OverallStatus::Fail)
    }

    /// Number of records per overall status: (pass, warn, fail).
    pub fn status_totals(&self) -> (usize, usize, usize) {
        self.records
            .iter()
            .fold((0, 0, 0), |(pass, warn, fail), outcome| {
                match outcome.report.overall_status {
                    OverallStatus::Pass => (pass + 1, warn, fail),
                    OverallStatus::Warn => (pass, warn + 1, fail),
                    OverallStatus::Fail => (pass, warn, fail + 1),
                }
            })
    }
}

/// Registry from a package directory, or the bundled packages.
pub fn load_registry(packages_dir: Option<&Path>) -> Result<PackageRegistry> {
    match packages_dir {
        Some(dir) => PackageRegistry::from_dir(dir)
            .with_context(|| format!("load packages from {}", dir.display())),
        None => PackageRegistry::embedded().context("load bundled packages"),
    }
}

/// Records from a JSON file holding an array of objects or a single object.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read records from {}", path.display()))?;
    parse_records(&text).with_context(|| format!("parse records in {}", path.display()))
}

pub fn parse_records(text: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Array(items) => {
            if let Some(index) = items.iter().position(|item| !item.is_object()) {
                bail!("record #{index} is not a JSON object");
            }
            Ok(items)
        }
        Value::Object(_) => Ok(vec![value]),
        _ => bail!("expected a JSON object or an array of objects"),
    }
}

pub fn load_catalog(path: Option<&Path>) -> Result<RuleCatalog> {
    match path {
        Some(path) => RuleCatalog::from_file(path)
            .with_context(|| format!("load rule catalog {}", path.display())),
        None => Ok(RuleCatalog::default()),
    }
}

pub fn load_reference_data(path: Option<&Path>) -> Result<Option<InMemoryReferenceData>> {
    path.map(|path| {
        InMemoryReferenceData::from_file(path)
            .with_context(|| format!("load reference data {}", path.display()))
    })
    .transpose()
}

/// Validate every record against one package, sharing a batch context so
/// uniqueness rules see the whole file.
pub fn validate_records(
    package: &RegulationPackage,
    report_type: Option<&str>,
    records: &[Record],
    ctx: &ValidationContext<'_>,
) -> Result<BatchResult> {
    let span = info_span!("validate", package = %package.package_id, records = records.len());
    let _guard = span.enter();
    let start = Instant::now();

    let batch = BatchContext::new();
    let mut outcomes = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let record_ref = RecordRef::from(index);
        let report = validate_record_in_batch(package, report_type, record, &record_ref, &batch, ctx)
            .with_context(|| format!("validate record {record_ref}"))?;
        outcomes.push(RecordOutcome {
            record: record_ref,
            report,
        });
    }

    let report_type = match outcomes.first() {
        Some(outcome) => outcome.report.report_type.clone(),
        None => regrep_standards::resolve_report_type(package, report_type)?
            .code
            .clone(),
    };
    let result = BatchResult {
        package_id: package.package_id.clone(),
        report_type,
        records: outcomes,
    };
    let (passed, warned, failed) = result.status_totals();
    info!(
        passed,
        warned,
        failed,
        duration_ms = start.elapsed().as_millis(),
        "validation complete"
    );
    Ok(result)
}
