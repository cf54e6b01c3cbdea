//! Seat enforcement: registry, session table, allocator, liveness, sweeper.
//!
//! Dependency order: `registry` -> `table` (over a `store`) -> `allocator`
//! -> `liveness` -> `sweeper`, with `notify` as the outbound edge. `gate`
//! composes them into the verify/heartbeat flows used by the transport.

pub mod allocator;
pub mod gate;
pub mod liveness;
pub mod notify;
pub mod registry;
pub mod store;
pub mod sweeper;
pub mod table;

pub use allocator::{Admission, SlotAllocator, Verified};
pub use gate::LicenseGate;
pub use liveness::LivenessTracker;
pub use notify::{spawn_notice_drain, ChannelNotifier, NoopNotifier, Notifier, TracingNotifier};
pub use registry::LicenseRegistry;
pub use store::{InMemorySessionStore, SessionStore};
pub use sweeper::{SweepPolicy, SweepReport, Sweeper, SweeperHandle};
pub use table::{KeyGuard, SessionTable};
