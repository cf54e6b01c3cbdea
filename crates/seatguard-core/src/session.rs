//! Per-key session sets.
//!
//! A `SessionSet` is the insertion-ordered list of device sessions bound to
//! one license key. Liveness is always judged against a caller-supplied
//! `now` and timeout, so a stale entry stays in the set (logically dead)
//! until an admit or a sweep rewrites it.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SeatError};

/// Opaque, globally unique session identifier handed to one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Fresh random token (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One logged-in device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub token: SessionToken,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            token: SessionToken::generate(),
            last_seen: now,
            created_at: now,
        }
    }

    /// Live while fewer than `timeout` has elapsed since the last heartbeat.
    pub fn is_live(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now.signed_duration_since(self.last_seen) < timeout
    }

    /// Refresh liveness. `last_seen` never moves backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_seen {
            self.last_seen = now;
        }
    }
}

// Persisted shape. `createdAt` is optional so older records without it still load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StoredSession {
    token: String,
    last_seen: DateTime<Utc>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Insertion-ordered sessions for one license key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSet {
    entries: Vec<SessionRecord>,
}

impl SessionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionRecord> {
        self.entries.iter()
    }

    pub fn get(&self, token: &str) -> Option<&SessionRecord> {
        self.entries.iter().find(|s| s.token.as_str() == token)
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut SessionRecord> {
        self.entries.iter_mut().find(|s| s.token.as_str() == token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.get(token).is_some()
    }

    pub fn push(&mut self, record: SessionRecord) {
        self.entries.push(record);
    }

    /// Drop everything; returns how many sessions were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// Remove dead entries, keeping the order of the survivors.
    pub fn prune_stale(&mut self, now: DateTime<Utc>, timeout: Duration) -> Vec<SessionRecord> {
        let (live, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|s| s.is_live(now, timeout));
        self.entries = live;
        dead
    }

    /// Remove and return the least recently seen live session.
    /// Ties go to the earliest inserted entry.
    pub fn evict_lru(&mut self, now: DateTime<Utc>, timeout: Duration) -> Option<SessionRecord> {
        let mut victim: Option<(usize, DateTime<Utc>)> = None;
        for (i, s) in self.entries.iter().enumerate() {
            if !s.is_live(now, timeout) {
                continue;
            }
            match victim {
                Some((_, seen)) if s.last_seen >= seen => {}
                _ => victim = Some((i, s.last_seen)),
            }
        }
        let (idx, _) = victim?;
        Some(self.entries.remove(idx))
    }

    /// Serialize to the persisted JSON list.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(&self.entries)
            .map_err(|e| SeatError::Internal(format!("session set encode failed: {e}")))
    }

    /// Parse a persisted JSON list. Anything that is not a well-formed list
    /// of distinct sessions is `MalformedState`.
    pub fn decode(raw: &str) -> Result<Self> {
        let stored: Vec<StoredSession> = serde_json::from_str(raw)
            .map_err(|e| SeatError::MalformedState(format!("invalid session list: {e}")))?;

        let mut set = SessionSet::new();
        for s in stored {
            if s.token.is_empty() {
                return Err(SeatError::MalformedState("empty session token".into()));
            }
            if set.contains(&s.token) {
                return Err(SeatError::MalformedState(format!("duplicate session token: {}", s.token)));
            }
            set.push(SessionRecord {
                token: SessionToken::from(s.token),
                last_seen: s.last_seen,
                created_at: s.created_at.unwrap_or(s.last_seen),
            });
        }
        Ok(set)
    }
}
