//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve)
//!     → server.rs (middleware: request ID, trace span, timeout)
//!     → request.rs (request ID generation and lookup)
//!     → dispatch::RequestDispatcher (select, forward, fail over)
//!     → response.rs (balancer-generated errors only)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
