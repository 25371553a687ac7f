//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (upstream, attempt, request_id)
//!     → per-request spans from the HTTP trace layer
//!
//! Consumers:
//!     → logging.rs (fmt subscriber on stdout)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the request span and to upstreams
//! - Internal error detail is logged, never sent to clients

pub mod logging;

pub use logging::init_logging;
