//! Procedure Cache
//!
//! Process-lifetime store of compiled clone procedures keyed by type.
//! Lookups are lock-free; compilation is serialised behind one mutex and
//! the cache is re-checked under it, so each type is compiled successfully
//! at most once and every caller observes the same entry. Failures are
//! cached too.
//!
//! No eviction and no invalidation: registered types never change.

use crate::compiler::{CloneProcedure, Compiled};
use crate::error::{CloneError, CloneResult};
use dashmap::DashMap;
use parking_lot::Mutex;
use replica_model::TypeKey;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Published entries, successes and failures
    pub entries: usize,
    /// Cached failures
    pub failures: usize,
    /// Lookups answered without locking
    pub hits: u64,
    /// Lookups that had to take the compile lock
    pub misses: u64,
    /// Compilation sessions run
    pub sessions: u64,
}

/// Type-keyed store of compiled procedures
#[derive(Debug, Default)]
pub struct ProcedureCache {
    entries: DashMap<TypeKey, CloneResult<CloneProcedure>>,
    compile_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    sessions: AtomicU64,
}

impl ProcedureCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Published entry for `key`, without touching statistics
    #[must_use]
    pub fn peek(&self, key: &TypeKey) -> Option<CloneResult<CloneProcedure>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Get the entry for `key`, running `build` once if it is missing
    ///
    /// `build` runs under the compile lock and returns every outcome it
    /// produced; all of them are published. It must not call back into
    /// this method.
    ///
    /// # Errors
    /// The cached or freshly compiled failure for `key`
    pub fn get_or_build<F>(&self, key: &TypeKey, build: F) -> CloneResult<CloneProcedure>
    where
        F: FnOnce() -> Vec<Compiled>,
    {
        if let Some(hit) = self.peek(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Procedure cache hit for {}", key);
            return hit;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let _guard = self.compile_lock.lock();

        // Another caller may have compiled it while we waited.
        if let Some(hit) = self.peek(key) {
            return hit;
        }

        self.sessions.fetch_add(1, Ordering::Relaxed);
        for (compiled_key, outcome) in build() {
            self.entries.entry(compiled_key).or_insert(outcome);
        }

        self.peek(key).unwrap_or_else(|| {
            Err(CloneError::unknown(format!(
                "compilation produced no procedure for '{key}'"
            )))
        })
    }

    /// Is `key` published
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of published entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nothing published yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            failures: self.entries.iter().filter(|entry| entry.is_err()).count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sessions: self.sessions.load(Ordering::Relaxed),
        }
    }
}
