//! Session table: per-key session sets behind per-key locks.
//!
//! Every read-modify-write of a key's set happens while holding that key's
//! `KeyGuard`. Locks are per key, so work on different licenses never
//! contends. Lock entries are created lazily and pruned by the sweeper once
//! nobody holds them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use seatguard_core::error::Result;
use seatguard_core::SessionSet;

use super::store::SessionStore;

pub struct SessionTable {
    store: Arc<dyn SessionStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionTable {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Acquire exclusive access to `key`'s set.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = Arc::clone(
            self.locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = lock.lock_owned().await;
        KeyGuard {
            table: self,
            key: key.to_owned(),
            recovered: AtomicBool::new(false),
            _guard: guard,
        }
    }

    /// Keys with a stored set.
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.store.keys().await
    }

    /// Drop lock entries nobody is holding or waiting on.
    /// Returns how many were removed.
    pub fn prune_idle_locks(&self) -> usize {
        let before = self.locks.len();
        // The map holds one reference; any guard or waiter holds another.
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn lock_entries(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive handle on one key's set. Released on drop.
pub struct KeyGuard<'a> {
    table: &'a SessionTable,
    key: String,
    recovered: AtomicBool,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard<'_> {
    /// Load the current set. Corrupt data is logged and read as empty;
    /// only backend failures are returned.
    pub async fn load(&self) -> Result<SessionSet> {
        let Some(raw) = self.table.store.load(&self.key).await? else {
            return Ok(SessionSet::new());
        };

        match SessionSet::decode(&raw) {
            Ok(set) => Ok(set),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "malformed session state, treating as empty");
                self.recovered.store(true, Ordering::Relaxed);
                Ok(SessionSet::new())
            }
        }
    }

    /// True once `load` has replaced corrupt data with an empty set.
    pub fn recovered(&self) -> bool {
        self.recovered.load(Ordering::Relaxed)
    }

    /// Replace the stored set in one write. An empty set removes the entry.
    pub async fn commit(&self, set: &SessionSet) -> Result<()> {
        if set.is_empty() {
            return self.table.store.remove(&self.key).await;
        }
        let encoded = set.encode()?;
        self.table.store.store(&self.key, encoded).await
    }
}
