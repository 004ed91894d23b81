//! Identifier format and checksum validators.
//!
//! Every validator is a pure function of the value (plus enum values or a
//! reference data provider for the ones that need them). An invalid value is
//! an ordinary [`FormatOutcome`], never an error.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use regrep_model::ModelError;

use crate::reference::{ReferenceDataProvider, ReferenceKind};

static LEI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{18}[0-9]{2}$").expect("Invalid LEI regex"));

static ISIN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}[0-9]$").expect("Invalid ISIN regex"));

static CURRENCY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("Invalid currency regex"));

static COUNTRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("Invalid country regex"));

static MIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{4}$").expect("Invalid MIC regex"));

/// UTI: 20-character LEI prefix followed by up to 32 characters.
static UTI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9]{18}[0-9]{2}[A-Z0-9]{1,32}$").expect("Invalid UTI regex")
});

static UPI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^QZ[A-Z0-9]{10}$").expect("Invalid UPI regex"));

static CFI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{6}$").expect("Invalid CFI regex"));

/// Name of a built-in validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorKey {
    LeiFormat,
    LeiChecksum,
    IsinFormat,
    IsinChecksum,
    IsoCurrency,
    IsoCountry,
    MicFormat,
    UtiFormat,
    UpiFormat,
    CfiFormat,
    EnumValue,
}

impl ValidatorKey {
    pub const ALL: [ValidatorKey; 11] = [
        Self::LeiFormat,
        Self::LeiChecksum,
        Self::IsinFormat,
        Self::IsinChecksum,
        Self::IsoCurrency,
        Self::IsoCountry,
        Self::MicFormat,
        Self::UtiFormat,
        Self::UpiFormat,
        Self::CfiFormat,
        Self::EnumValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeiFormat => "LEI_FORMAT",
            Self::LeiChecksum => "LEI_CHECKSUM",
            Self::IsinFormat => "ISIN_FORMAT",
            Self::IsinChecksum => "ISIN_CHECKSUM",
            Self::IsoCurrency => "ISO_CURRENCY",
            Self::IsoCountry => "ISO_COUNTRY",
            Self::MicFormat => "MIC_FORMAT",
            Self::UtiFormat => "UTI_FORMAT",
            Self::UpiFormat => "UPI_FORMAT",
            Self::CfiFormat => "CFI_FORMAT",
            Self::EnumValue => "ENUM_VALUE",
        }
    }

    /// Registry consulted by this validator when a provider is available.
    pub fn reference_kind(&self) -> Option<ReferenceKind> {
        match self {
            Self::IsoCurrency => Some(ReferenceKind::Currency),
            Self::IsoCountry => Some(ReferenceKind::Country),
            Self::MicFormat => Some(ReferenceKind::Mic),
            _ => None,
        }
    }

    /// Format validator for codes of a reference kind.
    pub fn for_reference_kind(kind: ReferenceKind) -> Self {
        match kind {
            ReferenceKind::Currency => Self::IsoCurrency,
            ReferenceKind::Country => Self::IsoCountry,
            ReferenceKind::Mic => Self::MicFormat,
        }
    }
}

impl fmt::Display for ValidatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidatorKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or(ModelError::UnknownValue {
                kind: "validator",
                value: wanted,
            })
    }
}

/// Result of one validator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutcome {
    pub valid: bool,
    pub reason: Option<String>,
}

impl FormatOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Inputs some validators need beyond the value itself.
#[derive(Clone, Copy, Default)]
pub struct ValidatorParams<'a> {
    /// Allowed values for [`ValidatorKey::EnumValue`].
    pub enum_values: Option<&'a [String]>,
    /// Registry for currency, country and MIC lookups.
    pub reference_data: Option<&'a dyn ReferenceDataProvider>,
}

impl fmt::Debug for ValidatorParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorParams")
            .field("enum_values", &self.enum_values)
            .field("reference_data", &self.reference_data.is_some())
            .finish()
    }
}

/// Run one validator against a value.
pub fn check(key: ValidatorKey, value: &str, params: ValidatorParams<'_>) -> FormatOutcome {
    let value = value.trim();
    match key {
        ValidatorKey::LeiFormat => regex_outcome(&LEI_REGEX, value, "LEI"),
        ValidatorKey::LeiChecksum => check_lei_checksum(value),
        ValidatorKey::IsinFormat => regex_outcome(&ISIN_REGEX, value, "ISIN"),
        ValidatorKey::IsinChecksum => check_isin_checksum(value),
        ValidatorKey::IsoCurrency => {
            check_reference_code(&CURRENCY_REGEX, ReferenceKind::Currency, value, params)
        }
        ValidatorKey::IsoCountry => {
            check_reference_code(&COUNTRY_REGEX, ReferenceKind::Country, value, params)
        }
        ValidatorKey::MicFormat => check_reference_code(&MIC_REGEX, ReferenceKind::Mic, value, params),
        ValidatorKey::UtiFormat => regex_outcome(&UTI_REGEX, value, "UTI"),
        ValidatorKey::UpiFormat => regex_outcome(&UPI_REGEX, value, "UPI"),
        ValidatorKey::CfiFormat => regex_outcome(&CFI_REGEX, value, "CFI code"),
        ValidatorKey::EnumValue => check_enum_value(value, params.enum_values.unwrap_or_default()),
    }
}

fn regex_outcome(regex: &Regex, value: &str, label: &str) -> FormatOutcome {
    if regex.is_match(value) {
        FormatOutcome::valid()
    } else {
        FormatOutcome::invalid(format!("'{value}' is not a well-formed {label}"))
    }
}

fn check_reference_code(
    regex: &Regex,
    kind: ReferenceKind,
    value: &str,
    params: ValidatorParams<'_>,
) -> FormatOutcome {
    if !regex.is_match(value) {
        return FormatOutcome::invalid(format!("'{value}' is not a well-formed {kind} code"));
    }
    match params.reference_data {
        Some(provider) if !provider.lookup(kind, value) => {
            FormatOutcome::invalid(format!("'{value}' is not a known {kind} code"))
        }
        _ => FormatOutcome::valid(),
    }
}

/// Check a value against an enumerated list (exact match after trimming).
pub fn check_enum_value(value: &str, allowed: &[String]) -> FormatOutcome {
    let value = value.trim();
    if allowed.iter().any(|candidate| candidate.trim() == value) {
        FormatOutcome::valid()
    } else {
        FormatOutcome::invalid(format!(
            "'{value}' is not one of: {}",
            allowed.join(", ")
        ))
    }
}

fn check_lei_checksum(value: &str) -> FormatOutcome {
    if !LEI_REGEX.is_match(value) {
        return FormatOutcome::invalid(format!("'{value}' is not a well-formed LEI"));
    }
    if lei_checksum_valid(value) {
        FormatOutcome::valid()
    } else {
        FormatOutcome::invalid(format!("'{value}' fails the ISO 17442 MOD 97-10 check"))
    }
}

fn check_isin_checksum(value: &str) -> FormatOutcome {
    if !ISIN_REGEX.is_match(value) {
        return FormatOutcome::invalid(format!("'{value}' is not a well-formed ISIN"));
    }
    if isin_checksum_valid(value) {
        FormatOutcome::valid()
    } else {
        FormatOutcome::invalid(format!("'{value}' fails the ISO 6166 check digit"))
    }
}

/// ISO 17442 MOD 97-10 check.
///
/// The value must be a well-formed upper-case LEI. The first 18 characters
/// are expanded (A=10 .. Z=35), "00" is appended, and the check digits must
/// equal `98 - (n mod 97)`.
pub fn lei_checksum_valid(lei: &str) -> bool {
    let lei = lei.trim();
    if !LEI_REGEX.is_match(lei) {
        return false;
    }
    let (body, check) = lei.split_at(18);
    let Ok(check) = check.parse::<u32>() else {
        return false;
    };
    let Some(remainder) = mod97(body.chars().chain("00".chars())) else {
        return false;
    };
    98 - remainder == check
}

/// Remainder modulo 97 of the digit expansion of `chars`.
fn mod97(chars: impl Iterator<Item = char>) -> Option<u32> {
    let mut remainder = 0u32;
    for ch in chars {
        let value = ch.to_digit(36)?;
        remainder = if value < 10 {
            (remainder * 10 + value) % 97
        } else {
            (remainder * 100 + value) % 97
        };
    }
    Some(remainder)
}

/// ISO 6166 check digit.
///
/// Letters expand to two digits (A=10 .. Z=35); the Luhn algorithm then runs
/// over the expanded digits of the first 11 characters.
pub fn isin_checksum_valid(isin: &str) -> bool {
    let isin = isin.trim();
    if !ISIN_REGEX.is_match(isin) {
        return false;
    }
    let (body, check) = isin.split_at(11);
    let Some(check) = check.chars().next().and_then(|ch| ch.to_digit(10)) else {
        return false;
    };

    let mut digits = Vec::with_capacity(22);
    for ch in body.chars() {
        let Some(value) = ch.to_digit(36) else {
            return false;
        };
        if value >= 10 {
            digits.push(value / 10);
        }
        digits.push(value % 10);
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(idx, &digit)| {
            if idx % 2 == 0 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();
    (10 - sum % 10) % 10 == check
}
