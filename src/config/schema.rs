//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits so embedders can deserialize them from their own sources.

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Static list of upstream URLs, in rotation order.
    pub upstreams: Vec<String>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Dispatch and retry settings.
    pub dispatch: DispatchConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable periodic health checks.
    pub enabled: bool,

    /// Interval between ticks in seconds.
    pub interval_secs: u64,

    /// Per-target TCP probe timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 20,
            timeout_secs: 2,
        }
    }
}

/// Request dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum number of targets tried for one inbound request.
    pub max_attempts: u32,

    /// Extra tries against the same target before it is marked down.
    pub retries_per_target: u32,

    /// Base delay for same-target retry backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for same-target retry backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Upstream connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Deadline for one forwarding attempt (until response headers) in seconds.
    pub forward_timeout_secs: u64,

    /// Largest request body buffered for replay, in bytes.
    pub max_body_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retries_per_target: 0,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 200,
            connect_timeout_secs: 2,
            forward_timeout_secs: 15,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall inbound request timeout in seconds.
    ///
    /// Must cover every forwarding attempt, so an exhausted attempt cap answers
    /// before this deadline does.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
