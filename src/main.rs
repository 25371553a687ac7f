//! Round-robin reverse-proxy load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────┐
//!                              │                 LOAD BALANCER                    │
//!                              │                                                  │
//!     Client Request           │  ┌─────────┐    ┌────────────┐    ┌───────────┐  │
//!     ─────────────────────────┼─▶│  http   │───▶│  dispatch  │───▶│  server   │  │
//!                              │  │ server  │    │ dispatcher │    │   pool    │  │
//!                              │  └─────────┘    └─────┬──────┘    └─────┬─────┘  │
//!                              │                       │ forward         │ alive? │
//!                              │                       ▼                 ▼        │
//!     Client Response          │                 ┌────────────┐    ┌───────────┐  │
//!     ◀────────────────────────┼─────────────────│ hyper      │    │ upstream  │  │
//!                              │                 │ client     │    │ targets   │◀─┼── health
//!                              │                 └─────┬──────┘    └───────────┘  │   checker
//!                              └───────────────────────┼──────────────────────────┘
//!                                                      ▼
//!                                                   Upstream
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use rr_balancer::config::{BalancerConfig, Cli};
use rr_balancer::lifecycle::signals;
use rr_balancer::observability::init_logging;
use rr_balancer::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BalancerConfig::from(Cli::parse());
    init_logging(&config.observability.log_level);

    tracing::info!("rr-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    let server = HttpServer::new(config)?;
    let config = server.config();
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstreams = config.upstreams.len(),
        health_interval_secs = config.health_check.interval_secs,
        max_attempts = config.dispatch.max_attempts,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
