use crate::domain::Intent;
use crate::foundation::{ArbiterError, ResolutionKey, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct StoreInner {
    pending: HashMap<ResolutionKey, Vec<Intent>>,
}

/// In-memory intent store: resolution key to arrival-ordered batch.
///
/// The sole shared mutable state of the engine. The inner mutex is held
/// only for the duration of a map operation, never across an await, so
/// ingestion, windows, and the sweeper interleave freely.
#[derive(Clone, Default)]
pub struct IntentStore {
    inner: Arc<Mutex<StoreInner>>,
}

/// Result of one expiry sweep.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SweepStats {
    pub removed_intents: usize,
    pub removed_keys: usize,
}

impl IntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_inner(&self, operation: &str) -> Result<MutexGuard<'_, StoreInner>> {
        self.inner.lock().map_err(|_| ArbiterError::store(operation, "poisoned lock"))
    }

    /// Insert one intent under its resolution key; returns the batch size
    /// after the insert.
    pub fn insert(&self, intent: Intent) -> Result<usize> {
        let key = intent.key();
        let mut inner = self.lock_inner("insert")?;
        let batch = inner.pending.entry(key).or_default();
        batch.push(intent);
        Ok(batch.len())
    }

    /// Remove and return the whole batch for a key, in arrival order.
    ///
    /// Snapshot and clear are one critical section, so a batch is consumed
    /// exactly once and the key never lingers empty.
    pub fn take(&self, key: &ResolutionKey) -> Result<Vec<Intent>> {
        let mut inner = self.lock_inner("take")?;
        Ok(inner.pending.remove(key).unwrap_or_default())
    }

    /// Drop every intent older than its ttl; keys left empty are removed.
    pub fn sweep_expired(&self, now_nanos: u64) -> Result<SweepStats> {
        let mut inner = self.lock_inner("sweep_expired")?;
        let mut removed_intents = 0usize;
        let keys_before = inner.pending.len();
        for batch in inner.pending.values_mut() {
            let before = batch.len();
            batch.retain(|intent| intent.is_active(now_nanos));
            removed_intents += before - batch.len();
        }
        inner.pending.retain(|_, batch| !batch.is_empty());
        let removed_keys = keys_before - inner.pending.len();
        Ok(SweepStats { removed_intents, removed_keys })
    }

    pub fn pending_keys(&self) -> Result<usize> {
        Ok(self.lock_inner("pending_keys")?.pending.len())
    }

    pub fn pending_intents(&self) -> Result<usize> {
        Ok(self.lock_inner("pending_intents")?.pending.values().map(Vec::len).sum())
    }

    /// Batch size for one key without consuming it.
    pub fn batch_len(&self, key: &ResolutionKey) -> Result<usize> {
        Ok(self.lock_inner("batch_len")?.pending.get(key).map(Vec::len).unwrap_or(0))
    }
}
