//! License registry: key -> record.
//!
//! Read on every verify, written only by activation/ban/issue events.

use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use seatguard_core::error::{Result, SeatError};
use seatguard_core::protocol::ActivationEvent;
use seatguard_core::LicenseRecord;

#[derive(Default)]
pub struct LicenseRegistry {
    records: DashMap<String, LicenseRecord>,
}

impl LicenseRegistry {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Build from seed records. Later duplicates replace earlier ones; config
    /// validation rejects duplicates before this point.
    pub fn from_records(records: impl IntoIterator<Item = LicenseRecord>) -> Self {
        let reg = Self::new();
        for r in records {
            reg.records.insert(r.key.clone(), r);
        }
        reg
    }

    pub fn lookup(&self, key: &str) -> Result<LicenseRecord> {
        self.records
            .get(key)
            .map(|r| r.value().clone())
            .ok_or(SeatError::KeyNotFound)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a pending license (checkout created, payment outstanding).
    pub fn issue_pending(&self, key: &str, tier: &str, max_sessions: u32, today: NaiveDate) -> Result<LicenseRecord> {
        match self.records.entry(key.to_owned()) {
            Entry::Occupied(_) => Err(SeatError::BadRequest(format!("license already exists: {key}"))),
            Entry::Vacant(v) => {
                let rec = LicenseRecord::pending(key, tier, max_sessions, today);
                v.insert(rec.clone());
                Ok(rec)
            }
        }
    }

    /// Apply a confirmed activation, creating the record if it is unknown.
    pub fn activate(&self, ev: &ActivationEvent, today: NaiveDate) -> Result<LicenseRecord> {
        ev.validate()?;
        let entry = self.records.entry(ev.key.clone());

        // Work on a copy so a rejected event leaves the registry untouched.
        let mut rec = match &entry {
            Entry::Occupied(o) => o.get().clone(),
            Entry::Vacant(_) => LicenseRecord::pending(ev.key.as_str(), ev.tier.as_str(), ev.max_sessions, today),
        };
        rec.activate(ev.tier.as_str(), ev.duration_days, ev.max_sessions, today)?;

        match entry {
            Entry::Occupied(mut o) => {
                o.insert(rec.clone());
            }
            Entry::Vacant(v) => {
                v.insert(rec.clone());
            }
        }
        Ok(rec)
    }

    pub fn ban(&self, key: &str, today: NaiveDate) -> Result<LicenseRecord> {
        let mut entry = self.records.get_mut(key).ok_or(SeatError::KeyNotFound)?;
        entry.value_mut().ban(today);
        Ok(entry.value().clone())
    }
}
