//! Top-level facade crate for seatguard.
//!
//! Re-exports the domain types and the server library so users can depend on a single crate.

pub mod core {
    pub use seatguard_core::*;
}

pub mod server {
    pub use seatguard_server::*;
}
