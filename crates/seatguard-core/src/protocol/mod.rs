//! Wire contracts (JSON, camelCase).
//!
//! Admin and heartbeat requests are parsed strictly: unknown fields are
//! rejected so that typos surface as `BAD_REQUEST` instead of being silently
//! ignored. The verify request is the exception and tolerates extra fields.
//! Outbound results always carry a definite `valid`/`ok` flag plus a stable
//! reason code on failure.

pub mod admin;
pub mod heartbeat;
pub mod notice;
pub mod verify;

pub use admin::{ActivationEvent, BanCommand, IssueCommand};
pub use heartbeat::{HeartbeatRequest, HeartbeatResponse};
pub use notice::Notice;
pub use verify::{VerifyRequest, VerifyResponse};
