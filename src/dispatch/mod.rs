//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (http::server)
//!     → dispatcher.rs (buffer body, AttemptContext)
//!     → ServerPool::next_alive_target
//!     → forward.rs (rewrite URI, strip hop-by-hop, per-attempt deadline)
//!     → on ForwardError: same-target retry if allowed, else mark down and reselect
//!     → response, or 503 when the pool or the attempt cap is exhausted
//! ```
//!
//! # Design Decisions
//! - `Forwarder` is a trait so the retry loop is testable without sockets
//! - Upstream status codes are passed through; only transport failures fail over
//! - Dropping the dispatch future (client gone) abandons the in-flight attempt

pub mod dispatcher;
pub mod forward;

pub use dispatcher::{ReplayableRequest, RequestDispatcher};
pub use forward::{ForwardError, Forwarder, HyperForwarder};
