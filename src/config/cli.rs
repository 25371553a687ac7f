//! Command-line surface.

use clap::Parser;

use crate::config::schema::{
    BalancerConfig, DispatchConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig,
};

#[derive(Debug, Parser)]
#[command(name = "rr-balancer")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
pub struct Cli {
    /// Address to accept inbound HTTP on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Upstream URL; repeat for each server, in rotation order
    #[arg(short = 'u', long = "upstream", required = true)]
    pub upstreams: Vec<String>,

    /// Seconds between health-check ticks
    #[arg(long, default_value_t = 20)]
    pub health_interval_secs: u64,

    /// Per-target TCP probe timeout in seconds
    #[arg(long, default_value_t = 2)]
    pub health_timeout_secs: u64,

    /// Disable the background health checker
    #[arg(long)]
    pub no_health_check: bool,

    /// Maximum targets tried per inbound request
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Extra tries against the same target before marking it down
    #[arg(long, default_value_t = 0)]
    pub retries_per_target: u32,

    /// Per-attempt forwarding deadline in seconds
    #[arg(long, default_value_t = 15)]
    pub forward_timeout_secs: u64,

    /// Overall inbound request deadline in seconds
    #[arg(long, default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl From<Cli> for BalancerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            listener: ListenerConfig {
                bind_address: cli.bind,
            },
            upstreams: cli.upstreams,
            health_check: HealthCheckConfig {
                enabled: !cli.no_health_check,
                interval_secs: cli.health_interval_secs,
                timeout_secs: cli.health_timeout_secs,
            },
            dispatch: DispatchConfig {
                max_attempts: cli.max_attempts,
                retries_per_target: cli.retries_per_target,
                forward_timeout_secs: cli.forward_timeout_secs,
                ..Default::default()
            },
            timeouts: TimeoutConfig {
                request_secs: cli.request_timeout_secs,
            },
            observability: ObservabilityConfig {
                log_level: cli.log_level,
            },
        }
    }
}
