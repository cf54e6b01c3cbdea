//! Slot allocator: admission and eviction against a license's device cap.
//!
//! Admission for one key runs entirely under that key's `KeyGuard`:
//! load -> drop dead entries -> evict least-recently-seen live sessions until
//! a slot is free -> append -> commit. Two concurrent admits on the same key
//! therefore always see each other's result, and the stored set never holds
//! more than `max_sessions` entries.
//!
//! Victims are chosen by `last_seen`, not by arrival order, so a device that
//! keeps heartbeating is never the one pushed out.
//!
//! The license is read from the registry only once the guard is held, so a
//! ban or expiry that lands before the lock is always seen.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use seatguard_core::error::{Result, SeatError};
use seatguard_core::protocol::Notice;
use seatguard_core::{LicenseRecord, SessionRecord, SessionToken};

use super::notify::Notifier;
use super::registry::LicenseRegistry;
use super::table::SessionTable;

/// Outcome of a successful admit.
#[derive(Debug, Clone)]
pub struct Admission {
    pub session: SessionRecord,
    /// Sessions pushed out to make room, oldest-seen first.
    pub evicted: Vec<SessionToken>,
    /// Live sessions on the key after admission (including the new one).
    pub active_count: usize,
    pub max_sessions: u32,
}

/// A granted verify: the license as read under the key lock, plus the slot.
#[derive(Debug, Clone)]
pub struct Verified {
    pub license: LicenseRecord,
    pub admission: Admission,
}

pub struct SlotAllocator {
    registry: Arc<LicenseRegistry>,
    table: Arc<SessionTable>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl SlotAllocator {
    pub fn new(
        registry: Arc<LicenseRegistry>,
        table: Arc<SessionTable>,
        notifier: Arc<dyn Notifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            table,
            notifier,
            timeout,
        }
    }

    /// Admit a new device on `key`.
    ///
    /// Unknown, pending, banned and expired licenses are rejected before the
    /// set is touched. A backend failure aborts before anything is written;
    /// notices are sent only after the new set is committed.
    pub async fn admit(&self, key: &str, now: DateTime<Utc>) -> Result<Verified> {
        let guard = self.table.lock(key).await;

        let license = self.registry.lookup(key)?;
        license.check_usable(now.date_naive())?;
        if license.max_sessions == 0 {
            return Err(SeatError::CapacityExceeded);
        }
        let cap = license.max_sessions as usize;

        let mut set = guard.load().await?;

        let dead = set.prune_stale(now, self.timeout);
        if !dead.is_empty() {
            tracing::debug!(key = %key, removed = dead.len(), "dropped stale sessions on admit");
        }

        let mut evicted = Vec::new();
        while set.len() >= cap {
            match set.evict_lru(now, self.timeout) {
                Some(victim) => evicted.push(victim.token),
                None => break,
            }
        }

        let mut session = SessionRecord::new(now);
        while set.contains(session.token.as_str()) {
            session = SessionRecord::new(now);
        }
        set.push(session.clone());

        guard.commit(&set).await?;
        let active_count = set.len();
        drop(guard);

        for token in &evicted {
            tracing::info!(key = %key, token = %token, "evicting least recently seen session");
            self.notifier.notify(Notice::Evicted {
                key: key.to_owned(),
                token: token.clone(),
            });
        }
        tracing::debug!(key = %key, token = %session.token, active_count, max = cap, "session admitted");

        let max_sessions = license.max_sessions;
        Ok(Verified {
            license,
            admission: Admission {
                session,
                evicted,
                active_count,
                max_sessions,
            },
        })
    }
}
