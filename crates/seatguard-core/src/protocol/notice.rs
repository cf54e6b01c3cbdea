//! Outbound notices handed to the notifier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::session::SessionToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A device lost its slot to a newer one.
    Evicted { key: String, token: SessionToken },
    Activated { key: String, expires_on: NaiveDate },
    Banned { key: String },
    /// The sweeper removed sessions from this key.
    Swept { key: String, removed: usize },
}

impl Notice {
    pub fn key(&self) -> &str {
        match self {
            Notice::Evicted { key, .. }
            | Notice::Activated { key, .. }
            | Notice::Banned { key }
            | Notice::Swept { key, .. } => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notice::Evicted { .. } => "evicted",
            Notice::Activated { .. } => "activated",
            Notice::Banned { .. } => "banned",
            Notice::Swept { .. } => "swept",
        }
    }
}
