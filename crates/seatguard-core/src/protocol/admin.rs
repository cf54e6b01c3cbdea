//! Inbound operator/payment events.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeatError};

/// Emitted once a payment is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActivationEvent {
    pub key: String,
    pub tier: String,
    pub duration_days: u32,
    pub max_sessions: u32,
}

impl ActivationEvent {
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(SeatError::BadRequest("activation key must not be empty".into()));
        }
        if self.duration_days == 0 {
            return Err(SeatError::BadRequest("durationDays must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BanCommand {
    pub key: String,
}

/// Register a pending license ahead of payment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IssueCommand {
    pub key: String,
    #[serde(default = "default_tier")]
    pub tier: String,
    pub max_sessions: u32,
}

fn default_tier() -> String {
    "standard".into()
}
