//! Verify: "may this device use the license?"

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SeatError};
use crate::session::SessionToken;

/// Verify request body. Deployed clients send extra fields (app version,
/// device info); only `licenseKey` is read and the rest is ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Missing and empty are both rejected by [`VerifyRequest::license_key`].
    #[serde(default)]
    pub license_key: Option<String>,
}

impl VerifyRequest {
    pub fn license_key(&self) -> Result<&str> {
        match self.license_key.as_deref() {
            Some(k) if !k.trim().is_empty() => Ok(k),
            _ => Err(SeatError::BadRequest("licenseKey is required".into())),
        }
    }
}

/// Verify result. `valid == false` always carries `reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<SessionToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sessions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human readable summary.
    pub message: String,
}

impl VerifyResponse {
    pub fn granted(token: SessionToken, expires_on: NaiveDate, active_count: usize, max_sessions: u32) -> Self {
        Self {
            valid: true,
            session_token: Some(token),
            expires_on: Some(expires_on),
            active_count: Some(active_count),
            max_sessions: Some(max_sessions),
            reason: None,
            message: "license key is valid".into(),
        }
    }

    pub fn denied(err: &SeatError) -> Self {
        let expires_on = match err {
            SeatError::Expired(d) => Some(*d),
            _ => None,
        };
        Self {
            valid: false,
            session_token: None,
            expires_on,
            active_count: None,
            max_sessions: None,
            reason: Some(err.client_code().as_str().to_owned()),
            message: err.to_string(),
        }
    }
}
