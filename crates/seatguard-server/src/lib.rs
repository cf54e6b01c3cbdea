//! seatguard server library entry.
//!
//! Wires configuration, the seat enforcement core, the HTTP transport and the
//! operational endpoints into one service. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod seats;
pub mod transport;
