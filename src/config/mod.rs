//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line
//!     → cli.rs (clap parse)
//!     → BalancerConfig (schema.rs)
//!     → validation.rs (semantic checks, upstream URLs parsed)
//!     → lifecycle::startup builds the ServerPool
//! ```
//!
//! # Design Decisions
//! - Config is immutable once validated; the upstream list never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (clap/serde) from semantic checks

pub mod cli;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use schema::BalancerConfig;
pub use schema::DispatchConfig;
pub use schema::HealthCheckConfig;
pub use schema::ListenerConfig;
pub use validation::{validate_config, ValidationError};
