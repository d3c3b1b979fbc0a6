//! Per-path lock table: acquires a path's full ancestor chain in the global
//! path order so that no two operations can deadlock against each other.

use std::sync::Arc;

use dashmap::DashMap;

use crate::path::Path;

use super::record::{LockMode, LockRecord};

/// Concurrent map from path to its lock record. Records are created lazily on
/// first use and never reclaimed for the lifetime of the table.
pub struct LockTable {
    records: DashMap<Path, Arc<LockRecord>>,
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LockTable {
    pub fn new() -> Self {
        LockTable { records: DashMap::new() }
    }

    fn record(&self, path: &Path) -> Arc<LockRecord> {
        self.records.entry(path.clone()).or_insert_with(|| Arc::new(LockRecord::new())).clone()
    }

    /// Acquires the full lock chain for `path`: every strict ancestor in
    /// shared mode, then `path` itself in `mode`, all in the global path
    /// order. Returns a guard that releases the chain (in reverse order) when
    /// dropped. Cancelling the returned future before it resolves unwinds any
    /// prefix of the chain already acquired, leaving no locks held.
    pub async fn acquire(&self, path: &Path, mode: LockMode) -> LockGuard {
        let chain = path.lock_chain();
        let mut held = Held(Vec::with_capacity(chain.len()));
        let last = chain.len().saturating_sub(1);
        for (i, p) in chain.iter().enumerate() {
            let rec = self.record(p);
            let m = if i == last { mode } else { LockMode::Shared };
            rec.lock(m).await;
            held.0.push((rec, m));
        }
        LockGuard(held)
    }
}

/// Holds the locks acquired for one lock chain. Dropping (or calling
/// [`LockGuard::release`], equivalent to a drop) unlocks the whole chain in
/// reverse acquisition order: target first, ancestors last.
pub struct LockGuard(Held);

impl LockGuard {
    pub fn release(self) {
        drop(self);
    }
}

struct Held(Vec<(Arc<LockRecord>, LockMode)>);

impl Drop for Held {
    fn drop(&mut self) {
        for (rec, mode) in self.0.drain(..).rev() {
            rec.unlock(mode);
        }
    }
}
