//! Reference data lookups (currencies, countries, market identifiers).
//!
//! The engine never owns reference data. Callers inject a
//! [`ReferenceDataProvider`] for synchronous use, or an
//! [`AsyncReferenceDataProvider`] for lookups behind an I/O boundary.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use regrep_model::ModelError;

use crate::error::{Result, ValidateError};

/// Registry a code is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReferenceKind {
    /// ISO 4217 currency codes.
    Currency,
    /// ISO 3166 country codes.
    Country,
    /// ISO 10383 market identifier codes.
    Mic,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Currency => "CURRENCY",
            Self::Country => "COUNTRY",
            Self::Mic => "MIC",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = ModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CURRENCY" => Ok(Self::Currency),
            "COUNTRY" => Ok(Self::Country),
            "MIC" => Ok(Self::Mic),
            other => Err(ModelError::UnknownValue {
                kind: "reference kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Synchronous reference data lookup.
pub trait ReferenceDataProvider: Send + Sync {
    /// Whether `code` is a known member of `kind`.
    fn lookup(&self, kind: ReferenceKind, code: &str) -> bool;
}

/// Reference data lookup behind an async boundary (a remote registry, a
/// database).
#[async_trait]
pub trait AsyncReferenceDataProvider: Send + Sync {
    async fn lookup(&self, kind: ReferenceKind, code: &str) -> bool;
}

/// Reference data held in memory.
///
/// Decodes from `{"CURRENCY": [...], "COUNTRY": [...], "MIC": [...]}`.
/// Codes are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryReferenceData {
    #[serde(rename = "CURRENCY", default)]
    currencies: BTreeSet<String>,
    #[serde(rename = "COUNTRY", default)]
    countries: BTreeSet<String>,
    #[serde(rename = "MIC", default)]
    mics: BTreeSet<String>,
}

impl InMemoryReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add codes for one kind.
    #[must_use]
    pub fn with_codes<I, S>(mut self, kind: ReferenceKind, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for code in codes {
            self.insert(kind, code.as_ref());
        }
        self
    }

    pub fn insert(&mut self, kind: ReferenceKind, code: &str) {
        self.set_mut(kind).insert(normalize(code));
    }

    pub fn contains(&self, kind: ReferenceKind, code: &str) -> bool {
        self.set(kind).contains(&normalize(code))
    }

    pub fn len(&self) -> usize {
        self.currencies.len() + self.countries.len() + self.mics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode from JSON text.
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self> {
        let data: Self = serde_json::from_str(json).map_err(|source| ValidateError::Decode {
            origin: origin.to_string(),
            source,
        })?;
        // Normalise codes written in lower case.
        Ok(Self::new()
            .with_codes(ReferenceKind::Currency, &data.currencies)
            .with_codes(ReferenceKind::Country, &data.countries)
            .with_codes(ReferenceKind::Mic, &data.mics))
    }

    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ValidateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let data = Self::from_json_str(&contents, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), codes = data.len(), "loaded reference data");
        Ok(data)
    }

    fn set(&self, kind: ReferenceKind) -> &BTreeSet<String> {
        match kind {
            ReferenceKind::Currency => &self.currencies,
            ReferenceKind::Country => &self.countries,
            ReferenceKind::Mic => &self.mics,
        }
    }

    fn set_mut(&mut self, kind: ReferenceKind) -> &mut BTreeSet<String> {
        match kind {
            ReferenceKind::Currency => &mut self.currencies,
            ReferenceKind::Country => &mut self.countries,
            ReferenceKind::Mic => &mut self.mics,
        }
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

impl ReferenceDataProvider for InMemoryReferenceData {
    fn lookup(&self, kind: ReferenceKind, code: &str) -> bool {
        self.contains(kind, code)
    }
}

#[async_trait]
impl AsyncReferenceDataProvider for InMemoryReferenceData {
    async fn lookup(&self, kind: ReferenceKind, code: &str) -> bool {
        self.contains(kind, code)
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryReferenceData, ReferenceDataProvider, ReferenceKind};

    #[test]
    fn decodes_keyed_code_lists() {
        let data = InMemoryReferenceData::from_json_str(
            r#"{"CURRENCY": ["EUR", "usd"], "MIC": ["XLON"]}"#,
            "inline",
        )
        .unwrap();
        assert!(data.lookup(ReferenceKind::Currency, "USD"));
        assert!(data.lookup(ReferenceKind::Currency, "eur"));
        assert!(!data.lookup(ReferenceKind::Country, "DE"));
        assert!(data.lookup(ReferenceKind::Mic, "XLON"));
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn rejects_unknown_json_shape() {
        let err = InMemoryReferenceData::from_json_str(r#"{"CURRENCY": "EUR"}"#, "bad.json")
            .unwrap_err();
        assert!(err.to_string().contains("bad.json"), "{err}");
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("mic".parse::<ReferenceKind>().unwrap(), ReferenceKind::Mic);
        assert!("LEI".parse::<ReferenceKind>().is_err());
    }
}
