use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration as StdDuration;

use axum::http::HeaderValue;
use chrono::NaiveDate;
use serde::Deserialize;
use seatguard_core::error::{Result, SeatError};
use seatguard_core::{LicenseRecord, LicenseStatus};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub sessions: SessionsSection,

    #[serde(default)]
    pub licenses: Vec<LicenseSeed>,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SeatError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.sessions.validate()?;

        let mut seen = HashSet::new();
        for l in &self.licenses {
            if l.key.trim().is_empty() {
                return Err(SeatError::BadRequest("licenses[].key must not be empty".into()));
            }
            if !seen.insert(l.key.as_str()) {
                return Err(SeatError::BadRequest(format!("duplicate license key: {}", l.key)));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Bearer token for `/v1/admin/*`. Admin routes answer 404 when unset.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Origins allowed by CORS. `"*"` allows any origin; an empty list
    /// sends no CORS headers at all.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            admin_token: None,
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if matches!(&self.admin_token, Some(t) if t.trim().is_empty()) {
            return Err(SeatError::BadRequest("server.admin_token must not be empty when set".into()));
        }
        for origin in &self.cors_origins {
            if origin != "*" && HeaderValue::from_str(origin).is_err() {
                return Err(SeatError::BadRequest(format!("server.cors_origins has an invalid origin: {origin:?}")));
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|_| SeatError::BadRequest(format!("server.listen must be a valid SocketAddr: {}", self.listen)))
    }
}

fn default_listen() -> String {
    "0.0.0.0:5000".into()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

/// What a sweep pass does to each key's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SweepPolicy {
    /// Remove only sessions whose last heartbeat is older than the timeout.
    #[default]
    PruneStale,
    /// Clear every set unconditionally.
    HardReset,
}

impl SweepPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SweepPolicy::PruneStale => "prune_stale",
            SweepPolicy::HardReset => "hard_reset",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsSection {
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,

    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    #[serde(default)]
    pub sweep_policy: SweepPolicy,

    #[serde(default = "default_notice_queue")]
    pub notice_queue: usize,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: default_liveness_timeout_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            sweep_policy: SweepPolicy::default(),
            notice_queue: default_notice_queue(),
        }
    }
}

impl SessionsSection {
    pub fn validate(&self) -> Result<()> {
        if !(5_000..=3_600_000).contains(&self.liveness_timeout_ms) {
            return Err(SeatError::BadRequest(
                "sessions.liveness_timeout_ms must be between 5000 and 3600000".into(),
            ));
        }
        if !(1_000..=86_400_000).contains(&self.sweep_interval_ms) {
            return Err(SeatError::BadRequest(
                "sessions.sweep_interval_ms must be between 1000 and 86400000".into(),
            ));
        }
        if !(1..=65_536).contains(&self.notice_queue) {
            return Err(SeatError::BadRequest(
                "sessions.notice_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn liveness_timeout(&self) -> chrono::Duration {
        // Range-checked in validate(), always fits.
        chrono::Duration::milliseconds(self.liveness_timeout_ms as i64)
    }

    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.sweep_interval_ms)
    }
}

fn default_liveness_timeout_ms() -> u64 {
    90_000
}
fn default_sweep_interval_ms() -> u64 {
    900_000
}
fn default_notice_queue() -> usize {
    1024
}

/// A license known at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseSeed {
    pub key: String,
    #[serde(default = "default_tier")]
    pub tier: String,
    pub expires_on: NaiveDate,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u32,
    #[serde(default)]
    pub status: LicenseStatus,
}

impl LicenseSeed {
    pub fn to_record(&self) -> LicenseRecord {
        LicenseRecord {
            key: self.key.clone(),
            tier: self.tier.clone(),
            expires_on: self.expires_on,
            max_sessions: self.max_sessions,
            status: self.status,
        }
    }
}

fn default_tier() -> String {
    "standard".into()
}
fn default_max_sessions() -> u32 {
    1
}
