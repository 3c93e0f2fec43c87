//! Compiled scope patterns.
//!
//! Scope patterns are looked up on every scoped settings read, so compiled
//! regexes are kept in a bounded LRU. Compile failures are cached too, so a
//! bad pattern loaded from disk is not recompiled on every lookup.

use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;

/// Patterns kept by [`PatternCache::new`].
const DEFAULT_CAPACITY: usize = 128;

/// A compiled pattern, or the compiler's message.
type Compiled = Result<Arc<Regex>, String>;

/// Bounded cache of compiled scope patterns. Shared by reference.
pub struct PatternCache {
    /// Pattern source to compile result.
    entries: Mutex<LruCache<String, Compiled>>,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCache {
    /// Cache holding the default number of patterns.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Cache holding at most `capacity` patterns (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Compiled form of `pattern`.
    pub fn compile(&self, pattern: &str) -> Result<Arc<Regex>, String> {
        if let Some(hit) = self.entries.lock().get(pattern) {
            return hit.clone();
        }
        let compiled = Regex::new(pattern).map(Arc::new).map_err(|e| e.to_string());
        self.entries
            .lock()
            .put(pattern.to_string(), compiled.clone());
        compiled
    }

    /// Whether `pattern` matches `text`.
    pub fn is_match(&self, pattern: &str, text: &str) -> Result<bool, String> {
        self.compile(pattern).map(|re| re.is_match(text))
    }

    /// Number of cached patterns, valid or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_compiled_patterns_and_evicts() {
        let cache = PatternCache::with_capacity(1);
        let a = cache.compile("^a$").unwrap();
        let again = cache.compile("^a$").unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert!(cache.is_match("^b$", "b").unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remembers_compile_errors() {
        let cache = PatternCache::new();
        let first = cache.compile("^(unclosed$").unwrap_err();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.is_match("^(unclosed$", "x"), Err(first));
    }
}
