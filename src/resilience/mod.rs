//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding attempt fails:
//!     → retries.rs (same-target retry budget left? back off and retry)
//!     → backoff.rs (jittered exponential delay)
//!     → otherwise mark target down, next attempt if the cap allows
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a deadline (see dispatch::forward)
//! - Attempts are capped per request to stop retry storms when the pool degrades
//! - Same-target retries are off by default; failover is immediate

pub mod backoff;
pub mod retries;

pub use retries::AttemptContext;
