//! Heartbeat: keep one device's session alive.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeatError};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HeartbeatRequest {
    pub license_key: String,
    pub session_token: String,
}

impl HeartbeatRequest {
    pub fn validate(&self) -> Result<()> {
        if self.license_key.is_empty() || self.session_token.is_empty() {
            return Err(SeatError::BadRequest("licenseKey and sessionToken are required".into()));
        }
        Ok(())
    }
}

/// `ok == false` means the device was replaced elsewhere and must verify again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HeartbeatResponse {
    pub fn ok() -> Self {
        Self { ok: true, reason: None }
    }

    pub fn invalid(err: &SeatError) -> Self {
        Self {
            ok: false,
            reason: Some(err.client_code().as_str().to_owned()),
        }
    }
}
