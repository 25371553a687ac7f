//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives at dispatcher
//!     → pool.rs (next_alive_target)
//!         - round_robin.rs (atomic cursor picks the starting slot)
//!         - target.rs (liveness read under shared lock)
//!     → Return target or NoAliveUpstream
//! ```
//!
//! # Design Decisions
//! - Targets are fixed at construction; no runtime add/remove
//! - The cursor belongs to the pool instance, never a global
//! - Dead targets are skipped with a scan bounded by pool size

pub mod pool;
pub mod round_robin;
pub mod target;

pub use pool::{PoolError, ServerPool};
pub use target::UpstreamTarget;
