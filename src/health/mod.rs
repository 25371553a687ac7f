//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe every target concurrently (TCP connect, bounded timeout)
//!     → UpstreamTarget::set_alive per target as soon as its probe returns
//!
//! Passive health checks (passive.rs):
//!     Forwarding failure observed by the dispatcher
//!     → UpstreamTarget::set_alive(false) immediately
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - The request path only ever reads liveness, except for passive mark-down
//! - Liveness is eventually consistent; staleness is bounded by the tick interval

pub mod active;
pub mod passive;

pub use active::{HealthChecker, Probe, TcpProbe};
