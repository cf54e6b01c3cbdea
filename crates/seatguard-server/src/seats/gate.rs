//! License gate: the verify and heartbeat flows plus the inbound admin events.
//!
//! Verify: registry lookup -> usability check -> admit.
//! Heartbeat: liveness touch.
//! All calendar checks use the UTC date of `now`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use seatguard_core::error::Result;
use seatguard_core::protocol::{ActivationEvent, Notice};
use seatguard_core::{LicenseRecord, SessionRecord};

use super::allocator::{SlotAllocator, Verified};
use super::liveness::LivenessTracker;
use super::notify::Notifier;
use super::registry::LicenseRegistry;
use super::table::SessionTable;

pub struct LicenseGate {
    registry: Arc<LicenseRegistry>,
    table: Arc<SessionTable>,
    allocator: SlotAllocator,
    liveness: LivenessTracker,
    notifier: Arc<dyn Notifier>,
}

impl LicenseGate {
    pub fn new(
        registry: Arc<LicenseRegistry>,
        table: Arc<SessionTable>,
        notifier: Arc<dyn Notifier>,
        timeout: chrono::Duration,
    ) -> Self {
        Self {
            allocator: SlotAllocator::new(Arc::clone(&registry), Arc::clone(&table), Arc::clone(&notifier), timeout),
            liveness: LivenessTracker::new(Arc::clone(&registry), Arc::clone(&table), timeout),
            registry,
            table,
            notifier,
        }
    }

    pub fn registry(&self) -> &LicenseRegistry {
        &self.registry
    }

    pub fn table(&self) -> &SessionTable {
        &self.table
    }

    pub async fn verify(&self, key: &str, now: DateTime<Utc>) -> Result<Verified> {
        // Cheap rejection before any per-key lock exists; the allocator
        // checks again under the lock.
        self.registry.lookup(key)?.check_usable(now.date_naive())?;
        self.allocator.admit(key, now).await
    }

    pub async fn heartbeat(&self, key: &str, token: &str, now: DateTime<Utc>) -> Result<SessionRecord> {
        self.liveness.touch(key, token, now).await
    }

    pub fn issue(&self, key: &str, tier: &str, max_sessions: u32, today: NaiveDate) -> Result<LicenseRecord> {
        let rec = self.registry.issue_pending(key, tier, max_sessions, today)?;
        tracing::info!(key = %key, tier = %tier, "license issued (pending)");
        Ok(rec)
    }

    pub fn activate(&self, ev: &ActivationEvent, today: NaiveDate) -> Result<LicenseRecord> {
        let rec = self.registry.activate(ev, today)?;
        self.notifier.notify(Notice::Activated {
            key: rec.key.clone(),
            expires_on: rec.expires_on,
        });
        Ok(rec)
    }

    /// Ban the license and drop every session it holds, so connected devices
    /// fail their next heartbeat.
    pub async fn ban(&self, key: &str, today: NaiveDate) -> Result<LicenseRecord> {
        let rec = self.registry.ban(key, today)?;

        let guard = self.table.lock(key).await;
        let mut set = guard.load().await?;
        let dropped = set.clear();
        guard.commit(&set).await?;
        drop(guard);

        tracing::info!(key = %key, sessions_dropped = dropped, "license banned");
        self.notifier.notify(Notice::Banned { key: key.to_owned() });
        Ok(rec)
    }
}
