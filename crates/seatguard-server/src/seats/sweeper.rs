//! Background sweeper.
//!
//! Runs on its own task at a fixed interval, outside the request path. Each
//! key is rewritten under its own lock, so a sweep pass never observes or
//! leaves a half-updated set. A failing key is logged and skipped; a failing
//! (or panicking) pass is logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use seatguard_core::error::Result;
use seatguard_core::protocol::Notice;

pub use crate::config::schema::SweepPolicy;
use crate::obs::ServiceMetrics;

use super::notify::Notifier;
use super::table::SessionTable;

/// Summary of one `sweep_all` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub keys_scanned: usize,
    pub sessions_removed: usize,
    pub keys_failed: usize,
}

pub struct Sweeper {
    table: Arc<SessionTable>,
    notifier: Arc<dyn Notifier>,
    metrics: Option<Arc<ServiceMetrics>>,
    policy: SweepPolicy,
    timeout: Duration,
    interval: StdDuration,
}

impl Sweeper {
    pub fn new(
        table: Arc<SessionTable>,
        notifier: Arc<dyn Notifier>,
        policy: SweepPolicy,
        timeout: Duration,
        interval: StdDuration,
    ) -> Self {
        Self {
            table,
            notifier,
            metrics: None,
            policy,
            timeout,
            interval,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// One pass over every stored key.
    pub async fn sweep_all(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let keys = match self.table.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "sweep could not list session keys");
                report.keys_failed = 1;
                self.record(&report);
                return report;
            }
        };

        for key in keys {
            report.keys_scanned += 1;
            match self.sweep_key(&key, now).await {
                Ok(removed) => report.sessions_removed += removed,
                Err(e) => {
                    report.keys_failed += 1;
                    tracing::warn!(key = %key, error = %e, "sweep failed for key, left unchanged");
                }
            }
        }

        let pruned = self.table.prune_idle_locks();
        tracing::debug!(
            policy = self.policy.as_str(),
            keys = report.keys_scanned,
            removed = report.sessions_removed,
            failed = report.keys_failed,
            idle_locks_pruned = pruned,
            "sweep pass complete"
        );
        self.record(&report);
        report
    }

    async fn sweep_key(&self, key: &str, now: DateTime<Utc>) -> Result<usize> {
        let guard = self.table.lock(key).await;
        let mut set = guard.load().await?;

        let removed = match self.policy {
            SweepPolicy::PruneStale => set.prune_stale(now, self.timeout).len(),
            SweepPolicy::HardReset => set.clear(),
        };

        if removed > 0 || guard.recovered() {
            guard.commit(&set).await?;
        }
        drop(guard);

        if removed > 0 {
            self.notifier.notify(Notice::Swept {
                key: key.to_owned(),
                removed,
            });
        }
        Ok(removed)
    }

    fn record(&self, report: &SweepReport) {
        let Some(m) = &self.metrics else { return };
        let result = if report.keys_failed == 0 { "ok" } else { "partial" };
        m.sweep_runs.inc(&[("result", result)]);
        m.sweep_removed.add(&[], report.sessions_removed as u64);
    }

    /// Tick until `shutdown` flips to true. The first pass runs one full
    /// interval after start.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            policy = self.policy.as_str(),
            interval_ms = self.interval.as_millis() as u64,
            "sweeper started"
        );

        let mut tick = time::interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let this = Arc::clone(&self);
                    // A pass runs on its own task so a panic inside it cannot take the loop down.
                    let pass = tokio::spawn(async move { this.sweep_all(Utc::now()).await });
                    if let Err(e) = pass.await {
                        tracing::error!(error = %e, "sweep pass aborted");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn spawn(self: Arc<Self>) -> SweeperHandle {
        let (tx, rx) = watch::channel(false);
        let join = tokio::spawn(self.run(rx));
        SweeperHandle { shutdown: tx, join }
    }
}

/// Owner handle for a running sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the loop to stop and wait for it. A pass already in flight
    /// finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "sweeper task ended abnormally");
        }
    }
}
