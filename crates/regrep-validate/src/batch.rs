//! Shared state for uniqueness rules across one batch of records.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Caller-chosen reference to a record in a batch (an index, a file
/// position, a message id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordRef(String);

impl RecordRef {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<usize> for RecordRef {
    fn from(index: usize) -> Self {
        Self(format!("#{index}"))
    }
}

impl From<&str> for RecordRef {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Uniqueness index for one batch: `(rule_id, key)` to the first record that
/// used the key.
///
/// Share one context between every worker validating the same batch; the
/// index is locked for each registration. Call [`reset`](Self::reset)
/// before reusing it for another batch.
#[derive(Debug, Default)]
pub struct BatchContext {
    seen: Mutex<HashMap<(String, Vec<String>), RecordRef>>,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the composite `key` for `rule_id`.
    ///
    /// Key parts are compared as a sequence, never joined. Returns `None` the
    /// first time a key is seen, otherwise the record that first used it.
    pub fn register(&self, rule_id: &str, key: &[String], record: &RecordRef) -> Option<RecordRef> {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match seen.entry((rule_id.to_string(), key.to_vec())) {
            Entry::Occupied(first) => Some(first.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                None
            }
        }
    }

    /// Forget every key.
    pub fn reset(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of distinct `(rule_id, key)` pairs seen.
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
