//! seatguard core: runtime-free license and session primitives.
//!
//! This crate defines the data model (license records, per-key session sets),
//! the wire contracts, and the error surface shared by the server and any
//! client tooling. It carries no transport or runtime dependencies so the
//! allocation rules can be reused and tested in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Corrupt persisted data surfaces as `SeatError::MalformedState` instead of
//! crashing the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod license;
pub mod protocol;
pub mod session;

/// Shared result type.
pub use error::{ClientCode, Result, SeatError};
pub use license::{LicenseRecord, LicenseStatus};
pub use session::{SessionRecord, SessionSet, SessionToken};
