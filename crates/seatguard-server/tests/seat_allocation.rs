#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tokio::sync::mpsc;

use seatguard_core::error::{Result, SeatError};
use seatguard_core::protocol::{ActivationEvent, Notice};
use seatguard_core::{LicenseRecord, LicenseStatus, SessionSet, SessionToken};
use seatguard_server::seats::{
    ChannelNotifier, InMemorySessionStore, LicenseGate, LicenseRegistry, NoopNotifier, SessionStore, SessionTable,
    SlotAllocator,
};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
}

fn license(key: &str, max_sessions: u32) -> LicenseRecord {
    LicenseRecord {
        key: key.into(),
        tier: "standard".into(),
        expires_on: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        max_sessions,
        status: LicenseStatus::Active,
    }
}

struct Harness {
    gate: Arc<LicenseGate>,
    store: Arc<InMemorySessionStore>,
    notices: mpsc::Receiver<Notice>,
}

impl Harness {
    fn new(records: Vec<LicenseRecord>, timeout: Duration) -> Self {
        let store = Arc::new(InMemorySessionStore::new());
        Self::with_store(records, timeout, store)
    }

    fn with_store(records: Vec<LicenseRecord>, timeout: Duration, store: Arc<InMemorySessionStore>) -> Self {
        let (notifier, notices) = ChannelNotifier::new(64);
        let registry = Arc::new(LicenseRegistry::from_records(records));
        let table = Arc::new(SessionTable::new(store.clone()));
        let gate = Arc::new(LicenseGate::new(registry, table, Arc::new(notifier), timeout));
        Self { gate, store, notices }
    }

    fn stored(&self, key: &str) -> SessionSet {
        self.store
            .get_raw(key)
            .map(|raw| SessionSet::decode(&raw).unwrap())
            .unwrap_or_default()
    }

    fn drain_notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(n) = self.notices.try_recv() {
            out.push(n);
        }
        out
    }

    async fn admit(&self, key: &str, now: DateTime<Utc>) -> SessionToken {
        self.gate.verify(key, now).await.unwrap().admission.session.token
    }
}

#[tokio::test]
async fn fourth_device_evicts_least_recently_seen() {
    let mut h = Harness::new(vec![license("K", 3)], Duration::hours(1));

    let s1 = h.admit("K", at(10, 0)).await;
    let s2 = h.admit("K", at(10, 5)).await;
    let s3 = h.admit("K", at(10, 10)).await;

    let v = h.gate.verify("K", at(10, 15)).await.unwrap();
    assert_eq!(v.admission.evicted, vec![s1.clone()]);
    assert_eq!(v.admission.active_count, 3);
    assert_eq!(v.admission.max_sessions, 3);

    let stored = h.stored("K");
    assert_eq!(stored.len(), 3);
    assert!(!stored.contains(s1.as_str()));
    assert!(stored.contains(s2.as_str()));
    assert!(stored.contains(s3.as_str()));

    let err = h.gate.heartbeat("K", s1.as_str(), at(10, 16)).await.unwrap_err();
    assert!(matches!(err, SeatError::InvalidSession));
    h.gate.heartbeat("K", s2.as_str(), at(10, 16)).await.unwrap();

    assert_eq!(
        h.drain_notices(),
        vec![Notice::Evicted {
            key: "K".into(),
            token: s1,
        }]
    );
}

#[tokio::test]
async fn heartbeat_keeps_an_older_session_from_being_evicted() {
    let h = Harness::new(vec![license("K", 2)], Duration::hours(1));

    let s1 = h.admit("K", at(10, 0)).await;
    let s2 = h.admit("K", at(10, 5)).await;
    h.gate.heartbeat("K", s1.as_str(), at(10, 6)).await.unwrap();

    let v = h.gate.verify("K", at(10, 10)).await.unwrap();
    assert_eq!(v.admission.evicted, vec![s2]);
    assert!(h.stored("K").contains(s1.as_str()));
}

#[tokio::test]
async fn stored_set_never_exceeds_cap() {
    let h = Harness::new(vec![license("K", 2)], Duration::hours(1));
    for i in 0..10 {
        h.admit("K", at(10, i)).await;
        assert!(h.stored("K").len() <= 2);
    }
    assert_eq!(h.stored("K").len(), 2);
}

#[tokio::test]
async fn zero_cap_license_admits_nobody() {
    let h = Harness::new(vec![license("K", 0)], Duration::hours(1));
    let err = h.gate.verify("K", at(10, 0)).await.unwrap_err();
    assert!(matches!(err, SeatError::CapacityExceeded));
    assert!(h.store.get_raw("K").is_none());
}

#[tokio::test]
async fn unusable_licenses_are_rejected_before_admission() {
    let mut expired = license("K1", 3);
    expired.expires_on = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut pending = license("K2", 3);
    pending.status = LicenseStatus::Pending;
    let mut banned = license("K3", 3);
    banned.status = LicenseStatus::Banned;

    let h = Harness::new(vec![expired, pending, banned], Duration::hours(1));

    match h.gate.verify("K1", at(10, 0)).await.unwrap_err() {
        SeatError::Expired(d) => assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(h.gate.verify("K2", at(10, 0)).await, Err(SeatError::NotActivated)));
    assert!(matches!(h.gate.verify("K3", at(10, 0)).await, Err(SeatError::NotActivated)));
    assert!(matches!(h.gate.verify("nope", at(10, 0)).await, Err(SeatError::KeyNotFound)));

    for key in ["K1", "K2", "K3", "nope"] {
        assert!(h.store.get_raw(key).is_none());
    }
}

#[tokio::test]
async fn license_is_usable_through_its_expiry_day() {
    let mut rec = license("K", 1);
    rec.expires_on = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let h = Harness::new(vec![rec], Duration::hours(1));

    h.gate.verify("K", at(23, 59)).await.unwrap();
    let next_day = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
    assert!(matches!(h.gate.verify("K", next_day).await, Err(SeatError::Expired(_))));
}

#[tokio::test]
async fn stale_sessions_are_dropped_on_admit_without_eviction() {
    let mut h = Harness::new(vec![license("K", 1)], Duration::seconds(90));

    let s1 = h.admit("K", at(10, 0)).await;
    let v = h.gate.verify("K", at(10, 5)).await.unwrap();
    assert!(v.admission.evicted.is_empty());
    assert_eq!(v.admission.active_count, 1);

    let err = h.gate.heartbeat("K", s1.as_str(), at(10, 5)).await.unwrap_err();
    assert!(matches!(err, SeatError::InvalidSession));
    assert!(h.drain_notices().is_empty());
}

#[tokio::test]
async fn heartbeat_on_dead_session_is_rejected() {
    let h = Harness::new(vec![license("K", 1)], Duration::seconds(90));
    let s1 = h.admit("K", at(10, 0)).await;

    let err = h.gate.heartbeat("K", s1.as_str(), at(10, 2)).await.unwrap_err();
    assert!(matches!(err, SeatError::InvalidSession));
}

#[tokio::test]
async fn heartbeat_never_moves_last_seen_backwards() {
    let h = Harness::new(vec![license("K", 1)], Duration::hours(1));
    let s1 = h.admit("K", at(10, 0)).await;

    let rec = h.gate.heartbeat("K", s1.as_str(), at(10, 10)).await.unwrap();
    assert_eq!(rec.last_seen, at(10, 10));

    let rec = h.gate.heartbeat("K", s1.as_str(), at(10, 5)).await.unwrap();
    assert_eq!(rec.last_seen, at(10, 10));
    assert_eq!(h.stored("K").get(s1.as_str()).unwrap().last_seen, at(10, 10));
}

#[tokio::test]
async fn heartbeat_for_unknown_key_allocates_nothing() {
    let h = Harness::new(vec![license("K", 1)], Duration::hours(1));
    let err = h.gate.heartbeat("ghost", "tok", at(10, 0)).await.unwrap_err();
    assert!(matches!(err, SeatError::InvalidSession));
    assert_eq!(h.gate.table().lock_entries(), 0);
    assert!(h.store.get_raw("ghost").is_none());
}

#[tokio::test]
async fn malformed_state_is_replaced_on_next_admit() {
    let store = Arc::new(InMemorySessionStore::new());
    store.insert_raw("K", "{not a list");
    let h = Harness::with_store(vec![license("K", 2)], Duration::hours(1), store);

    let v = h.gate.verify("K", at(10, 0)).await.unwrap();
    assert_eq!(v.admission.active_count, 1);
    assert_eq!(h.stored("K").len(), 1);
}

struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn load(&self, _key: &str) -> Result<Option<String>> {
        Err(SeatError::StorageFailure("backend unreachable".into()))
    }
    async fn store(&self, _key: &str, _encoded: String) -> Result<()> {
        Err(SeatError::StorageFailure("backend unreachable".into()))
    }
    async fn remove(&self, _key: &str) -> Result<()> {
        Err(SeatError::StorageFailure("backend unreachable".into()))
    }
    async fn keys(&self) -> Result<Vec<String>> {
        Err(SeatError::StorageFailure("backend unreachable".into()))
    }
}

#[tokio::test]
async fn storage_failure_aborts_verify_and_heartbeat() {
    let (notifier, mut notices) = ChannelNotifier::new(8);
    let registry = Arc::new(LicenseRegistry::from_records([license("K", 1)]));
    let table = Arc::new(SessionTable::new(Arc::new(FailingStore)));
    let gate = LicenseGate::new(registry, table, Arc::new(notifier), Duration::hours(1));

    assert!(matches!(gate.verify("K", at(10, 0)).await, Err(SeatError::StorageFailure(_))));
    assert!(matches!(
        gate.heartbeat("K", "tok", at(10, 0)).await,
        Err(SeatError::StorageFailure(_))
    ));
    assert!(notices.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_verifies_on_single_seat_leave_one_winner() {
    let h = Harness::new(vec![license("K", 1)], Duration::hours(1));

    let tasks = (0..16).map(|_| {
        let gate = Arc::clone(&h.gate);
        tokio::spawn(async move { gate.verify("K", at(10, 0)).await.unwrap().admission.session.token })
    });
    let tokens: Vec<SessionToken> = futures_util::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(h.stored("K").len(), 1);

    let mut ok = 0;
    for t in &tokens {
        if h.gate.heartbeat("K", t.as_str(), at(10, 1)).await.is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_keys_are_admitted_independently() {
    let records = (0..8).map(|i| license(&format!("K{i}"), 1)).collect();
    let h = Harness::new(records, Duration::hours(1));

    let tasks = (0..8).map(|i| {
        let gate = Arc::clone(&h.gate);
        tokio::spawn(async move { gate.verify(&format!("K{i}"), at(10, 0)).await.unwrap() })
    });
    for r in futures_util::future::join_all(tasks).await {
        let v = r.unwrap();
        assert!(v.admission.evicted.is_empty());
        assert_eq!(v.admission.active_count, 1);
    }
}

#[tokio::test]
async fn ban_drops_sessions_and_blocks_new_verifies() {
    let mut h = Harness::new(vec![license("K", 2)], Duration::hours(1));
    let s1 = h.admit("K", at(10, 0)).await;

    let rec = h.gate.ban("K", at(10, 1).date_naive()).await.unwrap();
    assert_eq!(rec.status, LicenseStatus::Banned);
    assert!(h.store.get_raw("K").is_none());

    assert!(matches!(
        h.gate.heartbeat("K", s1.as_str(), at(10, 2)).await,
        Err(SeatError::InvalidSession)
    ));
    assert!(matches!(h.gate.verify("K", at(10, 2)).await, Err(SeatError::NotActivated)));
    assert_eq!(h.drain_notices(), vec![Notice::Banned { key: "K".into() }]);
}

#[tokio::test]
async fn issued_license_needs_activation_before_verify() {
    let mut h = Harness::new(Vec::new(), Duration::hours(1));
    let today = at(10, 0).date_naive();

    h.gate.issue("NEW", "pro", 2, today).unwrap();
    assert!(matches!(h.gate.verify("NEW", at(10, 0)).await, Err(SeatError::NotActivated)));

    let ev = ActivationEvent {
        key: "NEW".into(),
        tier: "pro".into(),
        duration_days: 30,
        max_sessions: 2,
    };
    let rec = h.gate.activate(&ev, today).unwrap();
    assert_eq!(rec.expires_on, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());

    let v = h.gate.verify("NEW", at(10, 1)).await.unwrap();
    assert_eq!(v.admission.max_sessions, 2);
    assert_eq!(
        h.drain_notices(),
        vec![Notice::Activated {
            key: "NEW".into(),
            expires_on: rec.expires_on,
        }]
    );
}

#[tokio::test]
async fn lowered_cap_evicts_until_one_slot_is_free() {
    let mut h = Harness::new(vec![license("K", 3)], Duration::hours(1));
    let s1 = h.admit("K", at(10, 0)).await;
    let s2 = h.admit("K", at(10, 1)).await;
    let s3 = h.admit("K", at(10, 2)).await;

    let ev = ActivationEvent {
        key: "K".into(),
        tier: "basic".into(),
        duration_days: 30,
        max_sessions: 1,
    };
    h.gate.activate(&ev, at(10, 3).date_naive()).unwrap();
    h.drain_notices();

    let v = h.gate.verify("K", at(10, 4)).await.unwrap();
    assert_eq!(v.admission.evicted, vec![s1, s2, s3]);
    assert_eq!(v.admission.active_count, 1);
    assert_eq!(h.stored("K").len(), 1);
    assert_eq!(h.drain_notices().len(), 3);
}

/// Reads from memory, refuses every write.
struct ReadOnlyStore(InMemorySessionStore);

#[async_trait]
impl SessionStore for ReadOnlyStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        self.0.load(key).await
    }
    async fn store(&self, _key: &str, _encoded: String) -> Result<()> {
        Err(SeatError::StorageFailure("read-only".into()))
    }
    async fn remove(&self, _key: &str) -> Result<()> {
        Err(SeatError::StorageFailure("read-only".into()))
    }
    async fn keys(&self) -> Result<Vec<String>> {
        self.0.keys().await
    }
}

#[tokio::test]
async fn failed_write_leaves_stored_set_untouched() {
    let seeded = InMemorySessionStore::new();
    let existing = format!(
        r#"[{{"token":"old","lastSeen":"{}"}}]"#,
        at(10, 0).to_rfc3339()
    );
    seeded.insert_raw("K", existing.clone());
    let store = Arc::new(ReadOnlyStore(seeded));

    let (notifier, mut notices) = ChannelNotifier::new(8);
    let registry = Arc::new(LicenseRegistry::from_records([license("K", 1)]));
    let table = Arc::new(SessionTable::new(store.clone()));
    let gate = LicenseGate::new(registry, table, Arc::new(notifier), Duration::hours(1));

    assert!(matches!(gate.verify("K", at(10, 5)).await, Err(SeatError::StorageFailure(_))));
    assert_eq!(store.0.get_raw("K"), Some(existing));
    // The would-be victim was never evicted, so no notice went out.
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn expired_license_is_rejected_whatever_sessions_it_holds() {
    let mut rec = license("K1", 2);
    rec.expires_on = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let h = Harness::new(vec![rec], Duration::hours(1));

    let while_valid = Utc.with_ymd_and_hms(2023, 12, 31, 10, 0, 0).unwrap();
    let s1 = h.admit("K1", while_valid).await;
    let before = h.store.get_raw("K1").unwrap();

    let later = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
    match h.gate.verify("K1", later).await.unwrap_err() {
        SeatError::Expired(d) => assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(h.store.get_raw("K1").unwrap(), before);
    assert!(h.stored("K1").contains(s1.as_str()));
}

#[tokio::test]
async fn heartbeat_stops_once_the_license_expires() {
    let mut rec = license("K", 1);
    rec.expires_on = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let h = Harness::new(vec![rec], Duration::hours(1));

    let s1 = h.admit("K", at(23, 59)).await;
    h.gate.heartbeat("K", s1.as_str(), Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 30).unwrap()).await.unwrap();

    let after_midnight = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 30).unwrap();
    let err = h.gate.heartbeat("K", s1.as_str(), after_midnight).await.unwrap_err();
    assert!(matches!(err, SeatError::InvalidSession));
}

#[tokio::test]
async fn allocator_reads_license_state_under_the_key_lock() {
    let registry = Arc::new(LicenseRegistry::from_records([license("K", 2)]));
    let store = Arc::new(InMemorySessionStore::new());
    let table = Arc::new(SessionTable::new(store.clone()));
    let alloc = SlotAllocator::new(Arc::clone(&registry), table, Arc::new(NoopNotifier), Duration::hours(1));

    let v = alloc.admit("K", at(10, 0)).await.unwrap();
    assert_eq!(v.license.max_sessions, 2);

    // A ban landing after the caller's own check is still honoured.
    registry.ban("K", at(10, 1).date_naive()).unwrap();
    assert!(matches!(alloc.admit("K", at(10, 2)).await, Err(SeatError::NotActivated)));
    assert!(matches!(alloc.admit("ghost", at(10, 2)).await, Err(SeatError::KeyNotFound)));
    assert_eq!(SessionSet::decode(&store.get_raw("K").unwrap()).unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_verify_and_ban_never_leave_a_banned_license_with_sessions() {
    let records = (0..200).map(|i| license(&format!("K{i}"), 1)).collect();
    let h = Harness::new(records, Duration::hours(1));
    let today = at(10, 0).date_naive();

    let mut tasks = Vec::new();
    for i in 0..200 {
        let key = format!("K{i}");
        let gate = Arc::clone(&h.gate);
        let k = key.clone();
        tasks.push(tokio::spawn(async move {
            let _ = gate.verify(&k, at(10, 0)).await;
        }));
        let gate = Arc::clone(&h.gate);
        tasks.push(tokio::spawn(async move {
            gate.ban(&key, today).await.unwrap();
        }));
    }
    for r in futures_util::future::join_all(tasks).await {
        r.unwrap();
    }

    for i in 0..200 {
        assert!(h.store.get_raw(&format!("K{i}")).is_none(), "K{i} kept a session after ban");
    }
}
