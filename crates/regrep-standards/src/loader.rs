//! JSON package loaders.

use std::path::{Path, PathBuf};

use regrep_model::RegulationPackage;

use crate::error::{Result, StandardsError};
use crate::verify::verify_package;

/// Decode and verify a package from JSON text.
///
/// `origin` names the source in error messages (a file path or an
/// embedded package name).
pub fn load_package_str(json: &str, origin: &str) -> Result<RegulationPackage> {
    let package: RegulationPackage =
        serde_json::from_str(json).map_err(|source| StandardsError::Decode {
            origin: origin.to_string(),
            source,
        })?;
    verify_package(&package)?;
    tracing::debug!(
        package = %package.package_id,
        origin,
        fields = package.fields.len(),
        rules = package.validation_rules.len(),
        "loaded package"
    );
    Ok(package)
}

/// Load one package file.
pub fn load_package_file(path: &Path) -> Result<RegulationPackage> {
    let contents = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
    load_package_str(&contents, &path.display().to_string())
}

/// Load every `*.json` file in a directory, in path order.
pub fn load_dir(dir: &Path) -> Result<Vec<RegulationPackage>> {
    let entries = std::fs::read_dir(dir).map_err(|e| StandardsError::io(dir, e))?;
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StandardsError::io(dir, e))?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    paths.iter().map(|path| load_package_file(path)).collect()
}
