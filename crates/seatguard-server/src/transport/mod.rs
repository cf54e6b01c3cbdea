//! Transport layer (HTTP + JSON).
//!
//! Handlers decode each body once, hand the typed request to the license
//! gate and map the outcome back to a status code and wire shape.

pub mod cors;
pub mod http;

pub use http::{status_for, ApiError};
