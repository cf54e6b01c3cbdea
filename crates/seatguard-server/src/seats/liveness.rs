//! Liveness tracker: heartbeat refresh of an existing session.
//!
//! A touch never creates or removes sessions. It takes the key's lock for the
//! short read-modify-write so it cannot write back a session that a racing
//! admit has just evicted; the losing device sees `InvalidSession` on its
//! next heartbeat. Sessions on a license that has since expired or been
//! banned are no longer refreshed either.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use seatguard_core::error::{Result, SeatError};
use seatguard_core::SessionRecord;

use super::registry::LicenseRegistry;
use super::table::SessionTable;

pub struct LivenessTracker {
    registry: Arc<LicenseRegistry>,
    table: Arc<SessionTable>,
    timeout: Duration,
}

impl LivenessTracker {
    pub fn new(registry: Arc<LicenseRegistry>, table: Arc<SessionTable>, timeout: Duration) -> Self {
        Self {
            registry,
            table,
            timeout,
        }
    }

    /// Refresh `token` on `key`. Unknown key, unusable license, unknown
    /// token, evicted token and already-dead token all yield `InvalidSession`.
    pub async fn touch(&self, key: &str, token: &str, now: DateTime<Utc>) -> Result<SessionRecord> {
        // No per-key state is allocated for keys the registry has never seen.
        if !self.registry.contains(key) {
            return Err(SeatError::InvalidSession);
        }

        let guard = self.table.lock(key).await;

        let usable = self
            .registry
            .lookup(key)
            .is_ok_and(|license| license.is_usable(now.date_naive()));
        if !usable {
            tracing::debug!(key = %key, "heartbeat on unusable license");
            return Err(SeatError::InvalidSession);
        }

        let mut set = guard.load().await?;

        let Some(session) = set.get_mut(token) else {
            tracing::debug!(key = %key, "heartbeat for unknown session");
            return Err(SeatError::InvalidSession);
        };
        if !session.is_live(now, self.timeout) {
            tracing::debug!(key = %key, "heartbeat for stale session");
            return Err(SeatError::InvalidSession);
        }

        session.touch(now);
        let refreshed = session.clone();
        guard.commit(&set).await?;
        Ok(refreshed)
    }
}
