use anyhow::{Context, Result};
use comfy_table::Table;
use tracing::debug;

use regrep_cli::pipeline::{
    BatchResult, load_catalog, load_records, load_reference_data, load_registry, validate_records,
};
use regrep_validate::ValidationContext;

use crate::cli::{OutputArg, PackagesArgs, ValidateArgs};
use crate::summary::{apply_table_style, print_summary};

pub fn run_packages(args: &PackagesArgs) -> Result<()> {
    let registry = load_registry(args.packages_dir.as_deref())?;
    let mut table = Table::new();
    table.set_header(vec![
        "Package",
        "Regulation",
        "Version",
        "Report types",
        "Fields",
        "Rules",
    ]);
    apply_table_style(&mut table);
    for package in registry.iter() {
        let report_types = package
            .report_types
            .iter()
            .map(|report_type| report_type.code.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            package.package_id.clone(),
            package.regulation_code.clone(),
            package.version.clone(),
            report_types,
            package.fields.len().to_string(),
            package.validation_rules.len().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_validate(args: &ValidateArgs) -> Result<BatchResult> {
    let registry = load_registry(args.packages_dir.as_deref())?;
    let package = registry
        .find(&args.package)
        .with_context(|| format!("select package '{}'", args.package))?;
    let catalog = load_catalog(args.catalog.as_deref())?;
    let reference_data = load_reference_data(args.reference_data.as_deref())?;
    let records = load_records(&args.records)?;
    debug!(
        package = %package.package_id,
        records = records.len(),
        "inputs loaded"
    );

    let mut ctx = ValidationContext::new()
        .with_catalog(&catalog)
        .with_max_depth(args.max_depth);
    if let Some(data) = &reference_data {
        ctx = ctx.with_reference_data(data);
    }

    let result = validate_records(package, args.report_type.as_deref(), &records, &ctx)?;
    match args.output {
        OutputArg::Table => print_summary(&result),
        OutputArg::Json => {
            let json = serde_json::to_string_pretty(&result).context("serialize reports")?;
            println!("{json}");
        }
    }
    Ok(result)
}
