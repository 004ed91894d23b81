//! Immutable index of regulation packages.
//!
//! The registry is built once at startup and passed by reference to
//! whatever needs it. Nothing mutates it afterwards, so concurrent readers
//! need no locking.

use std::collections::BTreeMap;
use std::path::Path;

use regrep_model::{RegulationPackage, ReportTypeSpec};

use crate::embedded;
use crate::error::{Result, StandardsError};
use crate::loader::{load_dir, load_package_str};
use crate::verify::verify_package;

/// Packages indexed by id and by regulation code.
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    packages: Vec<RegulationPackage>,
    by_id: BTreeMap<String, usize>,
    by_code: BTreeMap<String, Vec<usize>>,
}

impl PackageRegistry {
    /// Build a registry, verifying every package and rejecting duplicate ids.
    pub fn from_packages(packages: Vec<RegulationPackage>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        let mut by_code: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, package) in packages.iter().enumerate() {
            verify_package(package)?;
            let id_key = package.package_id.trim().to_uppercase();
            if by_id.insert(id_key, idx).is_some() {
                return Err(StandardsError::DuplicatePackage {
                    package_id: package.package_id.clone(),
                });
            }
            by_code
                .entry(package.regulation_code.trim().to_uppercase())
                .or_default()
                .push(idx);
        }
        tracing::info!(packages = packages.len(), "package registry ready");
        Ok(Self {
            packages,
            by_id,
            by_code,
        })
    }

    /// Registry over the packages bundled with this crate.
    pub fn embedded() -> Result<Self> {
        let packages = embedded::PACKAGES
            .iter()
            .map(|(name, json)| load_package_str(json, name))
            .collect::<Result<Vec<_>>>()?;
        Self::from_packages(packages)
    }

    /// Registry over every `*.json` package in a directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Self::from_packages(load_dir(dir)?)
    }

    /// Look up by `package_id` (case-insensitive).
    pub fn get(&self, package_id: &str) -> Option<&RegulationPackage> {
        self.by_id
            .get(&package_id.trim().to_uppercase())
            .map(|&idx| &self.packages[idx])
    }

    /// All packages for a regulation code, in load order.
    pub fn by_regulation_code(&self, code: &str) -> Vec<&RegulationPackage> {
        self.by_code
            .get(&code.trim().to_uppercase())
            .map(|indices| indices.iter().map(|&idx| &self.packages[idx]).collect())
            .unwrap_or_default()
    }

    /// Look up by package id, falling back to a regulation code that maps
    /// to exactly one package.
    pub fn find(&self, key: &str) -> Result<&RegulationPackage> {
        if let Some(package) = self.get(key) {
            return Ok(package);
        }
        match self.by_regulation_code(key).as_slice() {
            [package] => Ok(*package),
            _ => Err(StandardsError::PackageNotFound {
                key: key.to_string(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegulationPackage> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Resolve the report type to validate against.
///
/// A code must name one of the package's report types. Omitting it is only
/// allowed when the package declares exactly one.
pub fn resolve_report_type<'a>(
    package: &'a RegulationPackage,
    code: Option<&str>,
) -> Result<&'a ReportTypeSpec> {
    let available = || {
        package
            .report_types
            .iter()
            .map(|report_type| report_type.code.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    match code {
        Some(code) => package
            .report_type(code)
            .ok_or_else(|| StandardsError::UnknownReportType {
                package_id: package.package_id.clone(),
                code: code.to_string(),
                available: available(),
            }),
        None => match package.report_types.as_slice() {
            [only] => Ok(only),
            _ => Err(StandardsError::ReportTypeRequired {
                package_id: package.package_id.clone(),
                available: available(),
            }),
        },
    }
}
