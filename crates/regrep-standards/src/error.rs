//! Error types for package loading and lookup.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or looking up regulation packages.
///
/// Every variant is fatal for the package it concerns: a package is either
/// loaded whole or rejected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StandardsError {
    /// Package file or directory could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Package JSON could not be decoded (includes malformed conditions).
    #[error("Failed to decode package {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// A package decoded but its shape is internally inconsistent.
    #[error("Invalid package '{package_id}' at {location}: {message}")]
    Configuration {
        package_id: String,
        location: String,
        message: String,
    },

    /// Two packages share a `package_id`.
    #[error("Duplicate package id '{package_id}'")]
    DuplicatePackage { package_id: String },

    /// No package with the given id or regulation code.
    #[error("Package not found: {key}")]
    PackageNotFound { key: String },

    /// The report type is not declared by the package.
    #[error("Report type '{code}' is not defined by package '{package_id}' (expected one of: {available})")]
    UnknownReportType {
        package_id: String,
        code: String,
        available: String,
    },

    /// No report type given for a package that declares several.
    #[error("Package '{package_id}' defines several report types; one of {available} is required")]
    ReportTypeRequired {
        package_id: String,
        available: String,
    },
}

impl StandardsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn configuration(
        package_id: &str,
        location: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Configuration {
            package_id: package_id.to_string(),
            location: location.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for standards operations.
pub type Result<T> = std::result::Result<T, StandardsError>;
