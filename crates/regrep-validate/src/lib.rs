//! Validation engine for regulation packages.
//!
//! Given a [`RegulationPackage`], a report type and a record, the engine
//! decides which fields are required, evaluates condition expressions,
//! executes the package's typed rules and folds everything into a
//! [`ValidationReport`].
//!
//! ```ignore
//! use regrep_standards::PackageRegistry;
//! use regrep_validate::{ValidationContext, validate_record};
//!
//! let registry = PackageRegistry::embedded()?;
//! let package = registry.find("EMIR")?;
//! let report = validate_record(package, Some("TRADE"), &record, &ValidationContext::new())?;
//! println!("{}", report.overall_status.label());
//! ```
//!
//! Failed checks are findings, never errors. The only `Err` is a report type
//! the package does not declare.

mod batch;
mod catalog;
mod condition;
mod error;
pub mod format;
mod pattern;
mod reference;
mod report;
mod requirement;
mod rules;
mod value;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{LazyLock, Mutex, PoisonError};

use regrep_model::{Finding, Record, RegulationPackage, ValidationReport};
use regrep_standards::resolve_report_type;

pub use batch::{BatchContext, RecordRef};
pub use catalog::{RuleCatalog, RuleHandler, RuleOutcome, keyword_validator};
pub use condition::{ConditionEvaluator, DEFAULT_MAX_DEPTH};
pub use error::{EvaluationError, Result, ValidateError};
pub use format::{FormatOutcome, ValidatorKey, ValidatorParams};
pub use reference::{
    AsyncReferenceDataProvider, InMemoryReferenceData, ReferenceDataProvider, ReferenceKind,
};
pub use regrep_model::path::{FieldPath, PathSegment, is_absent, resolve};
pub use report::aggregate;
pub use requirement::{EffectiveRequirement, FieldResolver, RequiredState};
pub use rules::RuleEngine;

static EMPTY_CATALOG: LazyLock<RuleCatalog> = LazyLock::new(RuleCatalog::default);

/// Engine configuration shared by every record of a run.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub catalog: Option<&'a RuleCatalog>,
    pub reference_data: Option<&'a dyn ReferenceDataProvider>,
    pub max_depth: usize,
}

impl Default for ValidationContext<'_> {
    fn default() -> Self {
        Self {
            catalog: None,
            reference_data: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("catalog", &self.catalog)
            .field("reference_data", &self.reference_data.is_some())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl<'a> ValidationContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, catalog: &'a RuleCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_reference_data(mut self, provider: &'a dyn ReferenceDataProvider) -> Self {
        self.reference_data = Some(provider);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn evaluator(&self) -> ConditionEvaluator {
        ConditionEvaluator::new(self.max_depth)
    }

    fn rule_engine<'p>(&self, reference_data: Option<&'p dyn ReferenceDataProvider>) -> RuleEngine<'p>
    where
        'a: 'p,
    {
        let engine = RuleEngine::new(self.catalog.unwrap_or(&*EMPTY_CATALOG), self.evaluator());
        match reference_data {
            Some(provider) => engine.with_reference_data(provider),
            None => engine,
        }
    }
}

/// Validate one record.
///
/// `report_type` may be omitted for packages that declare a single report
/// type. Uniqueness rules are reported as not automated; use
/// [`validate_record_in_batch`] to check them.
pub fn validate_record(
    package: &RegulationPackage,
    report_type: Option<&str>,
    record: &Record,
    ctx: &ValidationContext<'_>,
) -> Result<ValidationReport> {
    let code = resolve_report_type(package, report_type)?.code.as_str();
    Ok(run(package, code, record, ctx.rule_engine(ctx.reference_data), ctx, None))
}

/// Validate one record of a batch, checking uniqueness rules against the
/// keys earlier records registered in `batch`.
pub fn validate_record_in_batch(
    package: &RegulationPackage,
    report_type: Option<&str>,
    record: &Record,
    record_ref: &RecordRef,
    batch: &BatchContext,
    ctx: &ValidationContext<'_>,
) -> Result<ValidationReport> {
    let code = resolve_report_type(package, report_type)?.code.as_str();
    Ok(run(
        package,
        code,
        record,
        ctx.rule_engine(ctx.reference_data),
        ctx,
        Some((batch, record_ref)),
    ))
}

/// Validate one record with reference data behind an async boundary.
///
/// Every lookup the record needs is awaited first; the engine then runs
/// synchronously against a snapshot of the answers. The result equals
/// [`validate_record`] with an equivalent synchronous provider.
/// `ctx.reference_data` is ignored.
pub async fn validate_record_async(
    package: &RegulationPackage,
    report_type: Option<&str>,
    record: &Record,
    ctx: &ValidationContext<'_>,
    provider: &dyn AsyncReferenceDataProvider,
) -> Result<ValidationReport> {
    validate_async(package, report_type, record, ctx, provider, None).await
}

/// [`validate_record_in_batch`] with an async reference data provider.
pub async fn validate_record_in_batch_async(
    package: &RegulationPackage,
    report_type: Option<&str>,
    record: &Record,
    record_ref: &RecordRef,
    batch: &BatchContext,
    ctx: &ValidationContext<'_>,
    provider: &dyn AsyncReferenceDataProvider,
) -> Result<ValidationReport> {
    validate_async(package, report_type, record, ctx, provider, Some((batch, record_ref))).await
}

async fn validate_async(
    package: &RegulationPackage,
    report_type: Option<&str>,
    record: &Record,
    ctx: &ValidationContext<'_>,
    provider: &dyn AsyncReferenceDataProvider,
    batch: Option<(&BatchContext, &RecordRef)>,
) -> Result<ValidationReport> {
    let code = resolve_report_type(package, report_type)?.code.as_str();

    let recorder = LookupRecorder::default();
    ctx.rule_engine(Some(&recorder)).run(package, code, record, None);

    let mut snapshot = InMemoryReferenceData::new();
    for (kind, value) in recorder.into_lookups() {
        if provider.lookup(kind, &value).await {
            snapshot.insert(kind, &value);
        }
    }

    Ok(run(package, code, record, ctx.rule_engine(Some(&snapshot)), ctx, batch))
}

fn run(
    package: &RegulationPackage,
    report_type: &str,
    record: &Record,
    engine: RuleEngine<'_>,
    ctx: &ValidationContext<'_>,
    batch: Option<(&BatchContext, &RecordRef)>,
) -> ValidationReport {
    let resolver = FieldResolver::new(ctx.evaluator());
    let mut findings: Vec<Finding> = package
        .fields
        .iter()
        .flat_map(|field| resolver.check_field(field, report_type, record))
        .collect();
    findings.extend(engine.run(package, report_type, record, batch));

    let report = aggregate(&package.package_id, report_type, findings);
    tracing::debug!(
        package = %package.package_id,
        report_type,
        status = report.overall_status.label(),
        errors = report.counts.errors,
        warnings = report.counts.warnings,
        infos = report.counts.infos,
        "validated record"
    );
    report
}

/// Provider that answers every lookup with `true` and remembers it, used to
/// discover which lookups a record needs.
#[derive(Default)]
struct LookupRecorder {
    lookups: Mutex<BTreeSet<(ReferenceKind, String)>>,
}

impl LookupRecorder {
    fn into_lookups(self) -> BTreeSet<(ReferenceKind, String)> {
        self.lookups
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReferenceDataProvider for LookupRecorder {
    fn lookup(&self, kind: ReferenceKind, code: &str) -> bool {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, code.to_string()));
        true
    }
}
