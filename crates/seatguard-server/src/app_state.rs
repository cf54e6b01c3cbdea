//! Shared application state for the seatguard server.
//!
//! Lifecycle:
//! - init: `AppState::new(cfg, notifier)` seeds the registry from config and
//!   wires the session table, gate and metrics. Handlers receive clones via
//!   axum `State`; nothing is reachable through globals.
//! - run: `spawn_sweeper()` starts the background sweep task.
//! - teardown: `begin_drain()` flips readiness to 503, then the caller stops
//!   the sweeper through its `SweeperHandle` and drops the state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use seatguard_core::error::{Result, SeatError};

use crate::config::ServiceConfig;
use crate::obs::ServiceMetrics;
use crate::seats::{
    InMemorySessionStore, LicenseGate, LicenseRegistry, Notifier, SessionStore, SessionTable, Sweeper, SweeperHandle,
};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    gate: LicenseGate,
    table: Arc<SessionTable>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<ServiceMetrics>,
    draining: AtomicBool,
}

impl AppState {
    /// Build state over the in-memory session store.
    pub fn new(cfg: ServiceConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        Self::with_store(cfg, Arc::new(InMemorySessionStore::new()), notifier)
    }

    /// Build state over an explicit session backend.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn with_store(cfg: ServiceConfig, store: Arc<dyn SessionStore>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        cfg.validate()
            .map_err(|e| SeatError::BadRequest(format!("config rejected at startup: {e}")))?;

        let registry = Arc::new(LicenseRegistry::from_records(
            cfg.licenses.iter().map(|seed| seed.to_record()),
        ));
        tracing::info!(licenses = registry.len(), "license registry seeded");

        let table = Arc::new(SessionTable::new(store));
        let gate = LicenseGate::new(
            registry,
            Arc::clone(&table),
            Arc::clone(&notifier),
            cfg.sessions.liveness_timeout(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                gate,
                table,
                notifier,
                metrics: Arc::new(ServiceMetrics::default()),
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn gate(&self) -> &LicenseGate {
        &self.inner.gate
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.inner.metrics
    }

    /// Sweeper configured from `sessions.*`, sharing this state's table,
    /// notifier and metrics.
    pub fn sweeper(&self) -> Arc<Sweeper> {
        let s = &self.inner.cfg.sessions;
        Arc::new(
            Sweeper::new(
                Arc::clone(&self.inner.table),
                Arc::clone(&self.inner.notifier),
                s.sweep_policy,
                s.liveness_timeout(),
                s.sweep_interval(),
            )
            .with_metrics(Arc::clone(&self.inner.metrics)),
        )
    }

    pub fn spawn_sweeper(&self) -> SweeperHandle {
        self.sweeper().spawn()
    }

    pub fn begin_drain(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }

    /// Gauges rendered alongside the counters on `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("seatguard_licenses", self.inner.gate.registry().len() as u64),
            ("seatguard_session_lock_entries", self.inner.table.lock_entries() as u64),
            ("seatguard_notices_dropped", self.inner.notifier.dropped()),
            ("seatguard_draining", u64::from(self.is_draining())),
        ]
    }
}
