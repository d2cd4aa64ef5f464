//! Reference Tracker
//!
//! Per-invocation map from source identity to the clone produced for it.
//! Keeps aliasing intact and terminates cycles. Sources are held alive for
//! the tracker's lifetime so an address cannot be reused mid-clone.

use replica_model::Value;
use std::collections::HashMap;

/// Identity-keyed source-to-clone map
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    clones: HashMap<usize, (Value, Value)>,
}

impl ReferenceTracker {
    /// Create empty tracker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone already produced for `source`
    ///
    /// Always `None` for values without identity.
    #[must_use]
    pub fn lookup(&self, source: &Value) -> Option<Value> {
        let identity = source.identity()?;
        self.clones.get(&identity).map(|(_, clone)| clone.clone())
    }

    /// Record the clone of `source`
    ///
    /// Values without identity are ignored. Returns `false` if `source` was
    /// already registered; the first registration wins.
    pub fn register(&mut self, source: &Value, clone: &Value) -> bool {
        let Some(identity) = source.identity() else {
            return false;
        };
        if self.clones.contains_key(&identity) {
            return false;
        }
        self.clones.insert(identity, (source.clone(), clone.clone()));
        true
    }

    /// Number of tracked sources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clones.len()
    }

    /// Nothing tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }
}
