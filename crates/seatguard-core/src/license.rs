//! License records and their usability rules.
//!
//! A record moves `Pending -> Active -> Banned`; an active record whose
//! `expires_on` has passed stays in the registry but no longer verifies.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SeatError};

/// Lifecycle state of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    /// Issued, payment not yet confirmed.
    Pending,
    /// Paid and usable until `expires_on`.
    #[default]
    Active,
    /// Revoked by an operator.
    Banned,
}

/// One purchased entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    pub key: String,
    pub tier: String,
    /// Last calendar day (inclusive) on which the license verifies.
    pub expires_on: NaiveDate,
    /// Concurrent device cap. Zero means the license admits nobody.
    pub max_sessions: u32,
    pub status: LicenseStatus,
}

impl LicenseRecord {
    /// A freshly issued, not yet paid license.
    pub fn pending(key: impl Into<String>, tier: impl Into<String>, max_sessions: u32, today: NaiveDate) -> Self {
        Self {
            key: key.into(),
            tier: tier.into(),
            expires_on: today,
            max_sessions,
            status: LicenseStatus::Pending,
        }
    }

    /// Usability check used on every verify.
    ///
    /// Status is checked before the date so a banned key reports
    /// `NotActivated` even though banning also backdates `expires_on`.
    pub fn check_usable(&self, today: NaiveDate) -> Result<()> {
        if self.status != LicenseStatus::Active {
            return Err(SeatError::NotActivated);
        }
        if self.expires_on < today {
            return Err(SeatError::Expired(self.expires_on));
        }
        Ok(())
    }

    pub fn is_usable(&self, today: NaiveDate) -> bool {
        self.check_usable(today).is_ok()
    }

    /// Apply a confirmed activation: the license runs for `duration_days`
    /// starting today.
    pub fn activate(&mut self, tier: impl Into<String>, duration_days: u32, max_sessions: u32, today: NaiveDate) -> Result<()> {
        let expires_on = today
            .checked_add_days(Days::new(u64::from(duration_days)))
            .ok_or_else(|| SeatError::BadRequest(format!("duration_days out of range: {duration_days}")))?;

        self.tier = tier.into();
        self.max_sessions = max_sessions;
        self.expires_on = expires_on;
        self.status = LicenseStatus::Active;
        Ok(())
    }

    /// Revoke the license. Expiry is pulled back to yesterday as well.
    pub fn ban(&mut self, today: NaiveDate) {
        self.status = LicenseStatus::Banned;
        self.expires_on = today.pred_opt().unwrap_or(NaiveDate::MIN);
    }
}
