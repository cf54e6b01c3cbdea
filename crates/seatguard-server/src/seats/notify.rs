//! Notifier: fire-and-forget delivery of seat events.
//!
//! `notify` is synchronous and infallible. The channel implementation uses
//! `try_send` and drops on a full queue, so a slow consumer can never delay
//! an admit or a heartbeat.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use seatguard_core::protocol::Notice;

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Notices lost because the sink was saturated.
    fn dropped(&self) -> u64 {
        0
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: Notice) {}
}

/// Logs each notice in place.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        log_notice(&notice);
    }
}

/// Bounded queue towards an external consumer (bot, webhook relay, ...).
#[derive(Debug)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notice>,
    dropped: AtomicU64,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notice>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if let Err(e) = self.tx.try_send(notice) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let notice = match e {
                mpsc::error::TrySendError::Full(n) | mpsc::error::TrySendError::Closed(n) => n,
            };
            tracing::warn!(kind = notice.kind(), key = %notice.key(), "notice dropped");
        }
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Drain a notice queue into a `TracingNotifier` until every sender is gone.
pub fn spawn_notice_drain(mut rx: mpsc::Receiver<Notice>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sink = TracingNotifier;
        while let Some(notice) = rx.recv().await {
            sink.notify(notice);
        }
        tracing::debug!("notice queue closed");
    })
}

fn log_notice(notice: &Notice) {
    match notice {
        Notice::Evicted { key, token } => {
            tracing::info!(key = %key, token = %token, "session evicted")
        }
        Notice::Activated { key, expires_on } => {
            tracing::info!(key = %key, %expires_on, "license activated")
        }
        Notice::Banned { key } => tracing::info!(key = %key, "license banned"),
        Notice::Swept { key, removed } => {
            tracing::debug!(key = %key, removed, "sessions swept")
        }
    }
}
