//! Memoized rule snapshots
//!
//! Compiling a rule set is pure, so identical rule sets can share one
//! snapshot. Entries are keyed by the SHA-256 of the canonical JSON of the
//! enabled rules, which makes toggling a disabled rule's patterns a cache hit.

use crate::compiler::{Compilation, CompiledRuleSet};
use crate::constants::DEFAULT_SNAPSHOT_CACHE_CAPACITY;
use crate::Result;
use logtriage_core::Rule;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Content hash of the enabled rules, in declaration order.
pub fn fingerprint(rules: &[Rule]) -> Result<String> {
    let enabled: Vec<&Rule> = rules.iter().filter(|rule| rule.enabled).collect();
    let canonical = serde_json::to_vec(&enabled)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Compilation>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
}

/// Bounded FIFO cache of compiled snapshots.
pub struct SnapshotCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_CACHE_CAPACITY)
    }
}

impl SnapshotCache {
    /// Create a cache holding at most `capacity` snapshots (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Return the snapshot for `rules`, compiling it on a miss.
    ///
    /// The returned errors are those recorded when the snapshot was first built.
    pub fn get_or_compile(&self, rules: &[Rule]) -> Result<Compilation> {
        let key = fingerprint(rules)?;

        if let Some(hit) = self.state.lock().entries.get(&key) {
            debug!(fingerprint = %key, "rule snapshot cache hit");
            return Ok(hit.clone());
        }

        // Compile without holding the lock
        let compilation = CompiledRuleSet::compile(rules);

        let mut state = self.state.lock();
        if let Some(existing) = state.entries.get(&key) {
            return Ok(existing.clone());
        }
        while state.order.len() >= self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
            }
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, compilation.clone());

        Ok(compilation)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }
}
