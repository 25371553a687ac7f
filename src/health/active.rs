//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every upstream target
//! - Update each target's liveness as soon as its own probe finishes

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::{ServerPool, UpstreamTarget};

/// Reachability check for a single target.
///
/// The checker wraps every call in its own timeout.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, target: &UpstreamTarget) -> impl Future<Output = bool> + Send;
}

/// Plain TCP connect to the target's `host:port`; no payload is sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl Probe for TcpProbe {
    fn probe(&self, target: &UpstreamTarget) -> impl Future<Output = bool> + Send {
        let address = target.address();
        async move {
            let Some(address) = address else {
                return false;
            };
            match TcpStream::connect(address.as_str()).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(address = %address, error = %e, "TCP probe failed");
                    false
                }
            }
        }
    }
}

/// Background task that keeps target liveness current.
pub struct HealthChecker<P = TcpProbe> {
    pool: Arc<ServerPool>,
    config: HealthCheckConfig,
    probe: P,
}

impl HealthChecker<TcpProbe> {
    pub fn new(pool: Arc<ServerPool>, config: HealthCheckConfig) -> Self {
        Self::with_probe(pool, config, TcpProbe)
    }
}

impl<P: Probe> HealthChecker<P> {
    pub fn with_probe(pool: Arc<ServerPool>, config: HealthCheckConfig, probe: P) -> Self {
        Self {
            pool,
            config,
            probe,
        }
    }

    /// Tick until shutdown. The first tick fires immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            timeout = self.config.timeout_secs,
            targets = self.pool.size(),
            "Health checker starting"
        );

        if self.config.interval_secs == 0 {
            tracing::warn!("Health check interval of 0s raised to 1s");
        }
        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        // Late ticks are delayed, never burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every target concurrently; returns once all probes finished or timed out.
    pub async fn check_all(&self) {
        let started = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let probes = self
            .pool
            .targets()
            .iter()
            .map(|target| self.check_one(target, timeout));
        join_all(probes).await;

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            alive = self.pool.alive_count(),
            total = self.pool.size(),
            "Health check tick complete"
        );
    }

    async fn check_one(&self, target: &UpstreamTarget, timeout: Duration) {
        let alive = match time::timeout(timeout, self.probe.probe(target)).await {
            Ok(alive) => alive,
            Err(_) => {
                tracing::debug!(upstream = %target, timeout_ms = timeout.as_millis() as u64, "Health probe timed out");
                false
            }
        };

        let was_alive = target.set_alive(alive);
        let status = if alive { "up" } else { "down" };
        tracing::debug!(upstream = %target, status, "Health probe result");

        match (was_alive, alive) {
            (true, false) => tracing::warn!(upstream = %target, "Upstream marked down by health check"),
            (false, true) => tracing::info!(upstream = %target, "Upstream recovered"),
            _ => {}
        }
    }
}
