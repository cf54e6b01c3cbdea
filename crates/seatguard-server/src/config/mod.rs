//! Service config loader (strict parsing).

pub mod schema;

use std::fs;

use seatguard_core::error::{Result, SeatError};

pub use schema::{LicenseSeed, ServerSection, ServiceConfig, SessionsSection, SweepPolicy};

/// Default config path; overridden by `SEATGUARD_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "seatguard.yaml";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SeatError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| SeatError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
