//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the server pool from the validated upstream list
//!
//! # Design Decisions
//! - Fail fast: an invalid config or empty pool is fatal, never a per-request error

use thiserror::Error;

use crate::config::{validate_config, BalancerConfig, ValidationError};
use crate::load_balancer::{PoolError, ServerPool};

/// Fatal errors before the balancer starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate `config` and build the pool, in configuration order.
pub fn build_pool(config: &BalancerConfig) -> Result<ServerPool, StartupError> {
    let urls = validate_config(config).map_err(StartupError::Validation)?;
    let pool = ServerPool::from_urls(urls)?;

    for target in pool.targets() {
        tracing::info!(upstream = %target, "Configured upstream server");
    }
    Ok(pool)
}
