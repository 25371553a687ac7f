//! Configuration validation.
//!
//! # Responsibilities
//! - Parse upstream URLs and reject schemes the forwarder cannot speak
//! - Validate value ranges (intervals, timeouts, attempt cap > 0)
//! - Validate the bind address (`ip:port` or `host:port`)
//! - Keep the request deadline longer than the whole attempt budget
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: BalancerConfig → Result<Vec<Url>, Vec<ValidationError>>
//! - An empty upstream list is left to the pool, which reports `PoolEmpty`

use std::net::ToSocketAddrs;
use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream `{url}` is not a valid URL: {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },

    #[error("upstream `{url}` uses unsupported scheme `{scheme}` (only http is supported)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("bind address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("timeouts.request_secs ({request_secs}s) is shorter than the attempt budget ({attempt_budget_secs}s)")]
    RequestDeadlineTooShort {
        request_secs: u64,
        attempt_budget_secs: u64,
    },

    #[error("`{0}` must be greater than zero")]
    ZeroValue(&'static str),
}

/// Validate the configuration, returning the parsed upstream URLs in order.
pub fn validate_config(config: &BalancerConfig) -> Result<Vec<Url>, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !resolves(&config.listener.bind_address) {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let checks: [(&'static str, u64); 5] = [
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("dispatch.max_attempts", u64::from(config.dispatch.max_attempts)),
        ("dispatch.forward_timeout_secs", config.dispatch.forward_timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (name, value) in checks {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(name));
        }
    }

    let attempt_budget_secs = attempt_budget_secs(config);
    if config.timeouts.request_secs != 0 && config.timeouts.request_secs < attempt_budget_secs {
        errors.push(ValidationError::RequestDeadlineTooShort {
            request_secs: config.timeouts.request_secs,
            attempt_budget_secs,
        });
    }

    let mut urls = Vec::with_capacity(config.upstreams.len());
    for raw in &config.upstreams {
        match parse_upstream(raw) {
            Ok(url) => urls.push(url),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(urls)
    } else {
        Err(errors)
    }
}

/// Worst case time spent forwarding one request when every attempt times out.
pub fn attempt_budget_secs(config: &BalancerConfig) -> u64 {
    let dispatch = &config.dispatch;
    u64::from(dispatch.max_attempts)
        .saturating_mul(u64::from(dispatch.retries_per_target).saturating_add(1))
        .saturating_mul(dispatch.forward_timeout_secs)
}

fn resolves(address: &str) -> bool {
    address
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false)
}

fn parse_upstream(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidUpstreamUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" {
        return Err(ValidationError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    Ok(url)
}
