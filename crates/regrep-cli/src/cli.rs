//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "regrep",
    version,
    about = "Validate regulatory report records against regulation packages",
    long_about = "Validate regulatory report records against declarative regulation packages.\n\n\
                  Bundled packages cover an EMIR REFIT subset and MiFIR transaction reporting;\n\
                  --packages-dir loads packages from a directory instead."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List available regulation packages.
    Packages(PackagesArgs),

    /// Validate a file of records against one package.
    Validate(ValidateArgs),
}

#[derive(Parser)]
pub struct PackagesArgs {
    /// Load packages from this directory instead of the bundled set.
    #[arg(long = "packages-dir", value_name = "DIR")]
    pub packages_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// JSON file holding one record or an array of records.
    #[arg(value_name = "RECORDS")]
    pub records: PathBuf,

    /// Package id or regulation code (e.g. EMIR_REFIT or EMIR).
    #[arg(long = "package", value_name = "ID")]
    pub package: String,

    /// Report type code; may be omitted when the package declares only one.
    #[arg(long = "report-type", value_name = "CODE")]
    pub report_type: Option<String>,

    /// Load packages from this directory instead of the bundled set.
    #[arg(long = "packages-dir", value_name = "DIR")]
    pub packages_dir: Option<PathBuf>,

    /// Rule catalog JSON (format validators, enum values, reference kinds).
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Reference data JSON with CURRENCY, COUNTRY and MIC code lists.
    #[arg(long = "reference-data", value_name = "PATH")]
    pub reference_data: Option<PathBuf>,

    /// Maximum nesting depth for condition evaluation.
    #[arg(long = "max-depth", value_name = "N", default_value_t = regrep_validate::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Output format.
    #[arg(long = "output", value_enum, default_value = "table")]
    pub output: OutputArg,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    Table,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
