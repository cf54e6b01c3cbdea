//! Shared error type across seatguard crates.

use chrono::NaiveDate;
use thiserror::Error;

/// Client-facing reason codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// No license with this key.
    KeyNotFound,
    /// License is pending or banned.
    NotActivated,
    /// License expiry date has passed.
    Expired,
    /// License allows zero devices.
    CapacityExceeded,
    /// Session token unknown, stale or evicted.
    InvalidSession,
    /// Storage backend failed.
    StorageFailure,
    /// Persisted session data could not be decoded.
    MalformedState,
    /// Admin credential missing or wrong.
    Unauthorized,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::KeyNotFound => "KEY_NOT_FOUND",
            ClientCode::NotActivated => "NOT_ACTIVATED",
            ClientCode::Expired => "EXPIRED",
            ClientCode::CapacityExceeded => "CAPACITY_EXCEEDED",
            ClientCode::InvalidSession => "INVALID_SESSION",
            ClientCode::StorageFailure => "STORAGE_FAILURE",
            ClientCode::MalformedState => "MALFORMED_STATE",
            ClientCode::Unauthorized => "UNAUTHORIZED",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SeatError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum SeatError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("license key not found")]
    KeyNotFound,
    #[error("license not activated")]
    NotActivated,
    #[error("license expired on {0}")]
    Expired(NaiveDate),
    #[error("license allows no devices")]
    CapacityExceeded,
    #[error("invalid session")]
    InvalidSession,
    #[error("storage failure: {0}")]
    StorageFailure(String),
    #[error("malformed session state: {0}")]
    MalformedState(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl SeatError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SeatError::BadRequest(_) => ClientCode::BadRequest,
            SeatError::KeyNotFound => ClientCode::KeyNotFound,
            SeatError::NotActivated => ClientCode::NotActivated,
            SeatError::Expired(_) => ClientCode::Expired,
            SeatError::CapacityExceeded => ClientCode::CapacityExceeded,
            SeatError::InvalidSession => ClientCode::InvalidSession,
            SeatError::StorageFailure(_) => ClientCode::StorageFailure,
            SeatError::MalformedState(_) => ClientCode::MalformedState,
            SeatError::Unauthorized => ClientCode::Unauthorized,
            SeatError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            SeatError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Validation outcomes are terminal for the caller and never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SeatError::KeyNotFound
                | SeatError::NotActivated
                | SeatError::Expired(_)
                | SeatError::CapacityExceeded
                | SeatError::InvalidSession
        )
    }
}
