//! Compiled regex cache.
//!
//! Field patterns and `matches` conditions come from package data, so the
//! same handful of patterns is evaluated for every record of a batch.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;

/// Patterns kept before the cache starts over.
const CAPACITY: usize = 512;

static SHARED: LazyLock<PatternCache> = LazyLock::new(PatternCache::new);

/// Compile `pattern`, reusing an earlier compilation of the same text.
pub(crate) fn compiled(pattern: &str) -> Result<Regex, regex::Error> {
    SHARED.get(pattern)
}

#[derive(Debug, Default)]
pub(crate) struct PatternCache {
    compiled: Mutex<HashMap<String, Regex>>,
}

impl PatternCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Invalid patterns are not cached; every call reports the error again.
    pub(crate) fn get(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Some(regex) = self.lock().get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern)?;
        let mut compiled = self.lock();
        if compiled.len() >= CAPACITY {
            compiled.clear();
        }
        compiled.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Regex>> {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_compiled_pattern() {
        let cache = PatternCache::new();
        let first = cache.get("^[A-Z]{3}$").unwrap();
        let second = cache.get("^[A-Z]{3}$").unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(first.as_str(), second.as_str());
        assert!(second.is_match("EUR"));

        cache.get("^[0-9]+$").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalid_pattern_is_not_cached() {
        let cache = PatternCache::new();
        assert!(cache.get("[unclosed").is_err());
        assert!(cache.get("[unclosed").is_err());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn starts_over_when_full() {
        let cache = PatternCache::new();
        for n in 0..CAPACITY {
            cache.get(&format!("^{n}$")).unwrap();
        }
        assert_eq!(cache.len(), CAPACITY);
        cache.get("^extra$").unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn shared_cache_compiles() {
        assert!(compiled(r"^\d{4}$").unwrap().is_match("2024"));
        assert!(compiled("(").is_err());
    }
}
