//! Regulation package registry.
//!
//! Loads [`RegulationPackage`](regrep_model::RegulationPackage)s from JSON,
//! rejects packages with an inconsistent shape, and indexes the survivors in
//! an immutable [`PackageRegistry`].
//!
//! # Example
//!
//! ```ignore
//! use regrep_standards::{PackageRegistry, resolve_report_type};
//!
//! let registry = PackageRegistry::embedded()?;
//! let package = registry.find("EMIR")?;
//! let report_type = resolve_report_type(package, Some("TRADE"))?;
//! ```

pub mod embedded;
pub mod error;
pub mod loader;
pub mod registry;
pub mod verify;

pub use error::{Result, StandardsError};
pub use loader::{load_dir, load_package_file, load_package_str};
pub use registry::{PackageRegistry, resolve_report_type};
pub use verify::verify_package;
