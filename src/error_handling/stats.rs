//! Failure statistics tracking.
//!
//! This module provides thread-safe counters for the problems recorded during
//! a run, one counter per [`FailureKind`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::FailureKind;

/// Thread-safe failure statistics tracker.
///
/// All kinds are initialized to zero on creation. Counters are atomic so the
/// tracker can be shared between collectors fed from concurrent requests.
pub struct FailureStats {
    counts: HashMap<FailureKind, AtomicUsize>,
}

impl FailureStats {
    pub fn new() -> Self {
        let mut counts = HashMap::new();
        for kind in FailureKind::iter() {
            counts.insert(kind, AtomicUsize::new(0));
        }
        FailureStats { counts }
    }

    /// Increment the counter of a failure kind.
    pub fn increment(&self, kind: FailureKind) {
        if let Some(counter) = self.counts.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment failure counter for {:?} which is not in the map",
                kind
            );
        }
    }

    /// Get the count for a failure kind.
    pub fn get(&self, kind: FailureKind) -> usize {
        self.counts
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }
}

impl Default for FailureStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FailureStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in FailureKind::iter() {
            map.entry(&kind, &self.get(kind));
        }
        map.finish()
    }
}
