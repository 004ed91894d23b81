//! Rule configuration owned by the engine.
//!
//! Packages describe most rules in prose. The catalog maps rule ids to the
//! machine-checkable pieces the engine needs: which validators a `format`
//! rule runs, which values an `enum` rule allows, which registry a
//! `referential` rule consults, and which code handles a `cross_field` or
//! `business` rule.
//!
//! When a `format` or `referential` rule has no explicit entry, its
//! descriptive text (name, description, expression) is searched for the
//! phrases of a fixed keyword table. Nothing is parsed beyond that.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use regrep_model::{Record, ValidationRuleSpec};

use crate::error::{Result, ValidateError};
use crate::format::ValidatorKey;
use crate::reference::ReferenceKind;

/// Keyword table for rules without an explicit validator entry.
///
/// Ordered: the first phrase found (as whole words, case-insensitive) wins,
/// so specific standards come before generic identifier names.
const VALIDATOR_KEYWORDS: &[(&str, ValidatorKey)] = &[
    ("MOD 97", ValidatorKey::LeiChecksum),
    ("MOD-97", ValidatorKey::LeiChecksum),
    ("ISO 17442", ValidatorKey::LeiChecksum),
    ("LUHN", ValidatorKey::IsinChecksum),
    ("ISO 6166", ValidatorKey::IsinChecksum),
    ("UTI", ValidatorKey::UtiFormat),
    ("UPI", ValidatorKey::UpiFormat),
    ("CFI", ValidatorKey::CfiFormat),
    ("ISO 10962", ValidatorKey::CfiFormat),
    ("ISO 4217", ValidatorKey::IsoCurrency),
    ("ISO 3166", ValidatorKey::IsoCountry),
    ("ISO 10383", ValidatorKey::MicFormat),
    ("LEI", ValidatorKey::LeiFormat),
    ("ISIN", ValidatorKey::IsinFormat),
    ("CURRENCY", ValidatorKey::IsoCurrency),
    ("COUNTRY", ValidatorKey::IsoCountry),
    ("MIC", ValidatorKey::MicFormat),
];

/// Outcome of a code-registered rule handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub passed: bool,
    pub message: String,
    /// Record path the outcome points at, if any.
    pub path: Option<String>,
}

impl RuleOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            path: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Code that checks one `cross_field` or `business` rule.
pub trait RuleHandler: Send + Sync {
    fn check(&self, rule: &ValidationRuleSpec, record: &Record) -> RuleOutcome;
}

impl<F> RuleHandler for F
where
    F: Fn(&ValidationRuleSpec, &Record) -> RuleOutcome + Send + Sync,
{
    fn check(&self, rule: &ValidationRuleSpec, record: &Record) -> RuleOutcome {
        self(rule, record)
    }
}

/// Rule configuration table.
///
/// Everything but `handlers` decodes from JSON:
///
/// ```json
/// {
///   "format_validators": { "EMIR_VR_001": ["LEI_CHECKSUM"] },
///   "enum_values": { "EMIR_VR_005": ["NEWT", "MODI"] },
///   "referential_kinds": { "EMIR_VR_006": "CURRENCY" }
/// }
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RuleCatalog {
    #[serde(default)]
    format_validators: BTreeMap<String, Vec<ValidatorKey>>,
    #[serde(default)]
    enum_values: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    referential_kinds: BTreeMap<String, ReferenceKind>,
    #[serde(skip)]
    handlers: BTreeMap<String, Arc<dyn RuleHandler>>,
}

impl fmt::Debug for RuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleCatalog")
            .field("format_validators", &self.format_validators)
            .field("enum_values", &self.enum_values)
            .field("referential_kinds", &self.referential_kinds)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the serialisable part of a catalog from JSON text.
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| ValidateError::Decode {
            origin: origin.to_string(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ValidateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&contents, &path.display().to_string())?;
        tracing::debug!(
            path = %path.display(),
            format_rules = catalog.format_validators.len(),
            enum_rules = catalog.enum_values.len(),
            referential_rules = catalog.referential_kinds.len(),
            "loaded rule catalog"
        );
        Ok(catalog)
    }

    #[must_use]
    pub fn with_format_validators(
        mut self,
        rule_id: impl Into<String>,
        validators: impl IntoIterator<Item = ValidatorKey>,
    ) -> Self {
        self.format_validators
            .insert(rule_id.into(), validators.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_enum_values<I, S>(mut self, rule_id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values
            .insert(rule_id.into(), values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_referential_kind(mut self, rule_id: impl Into<String>, kind: ReferenceKind) -> Self {
        self.referential_kinds.insert(rule_id.into(), kind);
        self
    }

    /// Register a handler for a `cross_field` or `business` rule.
    #[must_use]
    pub fn with_handler(
        mut self,
        rule_id: impl Into<String>,
        handler: impl RuleHandler + 'static,
    ) -> Self {
        self.handlers.insert(rule_id.into(), Arc::new(handler));
        self
    }

    /// Validators for a `format` rule: the explicit entry, else the first
    /// keyword match on the rule's descriptive text.
    pub fn validators_for(&self, rule: &ValidationRuleSpec) -> Vec<ValidatorKey> {
        if let Some(validators) = self.format_validators.get(&rule.rule_id) {
            return validators.clone();
        }
        keyword_validator(&rule.descriptive_text())
            .into_iter()
            .collect()
    }

    /// Allowed values for an `enum`/`enumeration` rule.
    pub fn enum_values_for(&self, rule_id: &str) -> Option<&[String]> {
        self.enum_values.get(rule_id).map(Vec::as_slice)
    }

    /// Registry for a `referential` rule: the explicit entry, else the
    /// registry of the first keyword-matched validator.
    pub fn referential_kind_for(&self, rule: &ValidationRuleSpec) -> Option<ReferenceKind> {
        if let Some(kind) = self.referential_kinds.get(&rule.rule_id) {
            return Some(*kind);
        }
        let text = rule.descriptive_text();
        VALIDATOR_KEYWORDS
            .iter()
            .filter(|(phrase, _)| contains_phrase(&text, phrase))
            .find_map(|(_, key)| key.reference_kind())
    }

    pub fn handler(&self, rule_id: &str) -> Option<&dyn RuleHandler> {
        self.handlers.get(rule_id).map(Arc::as_ref)
    }
}

/// First validator whose keyword appears in `text`.
pub fn keyword_validator(text: &str) -> Option<ValidatorKey> {
    VALIDATOR_KEYWORDS
        .iter()
        .find(|(phrase, _)| contains_phrase(text, phrase))
        .map(|(_, key)| *key)
}

/// Case-insensitive whole-word phrase search.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let text = text.to_uppercase();
    let is_word = |ch: Option<char>| ch.is_some_and(|c| c.is_ascii_alphanumeric());
    text.match_indices(phrase).any(|(start, found)| {
        let before = text[..start].chars().next_back();
        let after = text[start + found.len()..].chars().next();
        !is_word(before) && !is_word(after)
    })
}
