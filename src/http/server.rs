//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all dispatch handler
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Spawn the health checker next to the server
//! - Serve until the shutdown broadcast fires

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::State,
    http::{Request, Response},
    routing::any,
    BoxError, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{
    timeout::{error::Elapsed, TimeoutLayer},
    ServiceBuilder,
};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::dispatch::{Forwarder, HyperForwarder, RequestDispatcher};
use crate::health::HealthChecker;
use crate::http::request::{RequestIdExt, UuidRequestId};
use crate::http::response;
use crate::lifecycle::startup::{build_pool, StartupError};
use crate::load_balancer::ServerPool;

/// HTTP front of the load balancer.
pub struct HttpServer {
    router: Router,
    pool: Arc<ServerPool>,
    config: BalancerConfig,
}

impl HttpServer {
    /// Validate the configuration, build the pool, and forward with a hyper client.
    pub fn new(config: BalancerConfig) -> Result<Self, StartupError> {
        let pool = Arc::new(build_pool(&config)?);
        let forwarder = HyperForwarder::new(
            Duration::from_secs(config.dispatch.connect_timeout_secs),
            Duration::from_secs(config.dispatch.forward_timeout_secs),
        );
        Ok(Self::with_forwarder(config, pool, forwarder))
    }

    /// Build a server around an existing pool and forwarder.
    pub fn with_forwarder<F: Forwarder>(
        config: BalancerConfig,
        pool: Arc<ServerPool>,
        forwarder: F,
    ) -> Self {
        let dispatcher = Arc::new(RequestDispatcher::new(
            pool.clone(),
            forwarder,
            config.dispatch.clone(),
        ));
        let router = Self::build_router(&config, dispatcher);
        Self {
            router,
            pool,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<F: Forwarder>(
        config: &BalancerConfig,
        dispatcher: Arc<RequestDispatcher<F>>,
    ) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request.request_id(),
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(HandleErrorLayer::new(request_deadline_elapsed))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )));

        Router::new()
            .route("/", any(dispatch_handler::<F>))
            .route("/{*path}", any(dispatch_handler::<F>))
            .with_state(dispatcher)
            .layer(middleware)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstreams = self.pool.size(),
            "HTTP server starting"
        );

        let checker = HealthChecker::new(self.pool.clone(), self.config.health_check.clone());
        let health_task = tokio::spawn(checker.run(shutdown.resubscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        if served.is_err() {
            health_task.abort();
        }
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router with all layers, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The shared server pool.
    pub fn pool(&self) -> Arc<ServerPool> {
        self.pool.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }
}

async fn dispatch_handler<F: Forwarder>(
    State(dispatcher): State<Arc<RequestDispatcher<F>>>,
    request: Request<Body>,
) -> Response<Body> {
    dispatcher.dispatch(request).await
}

/// The overall deadline fired before dispatch finished; answered like an exhausted attempt cap.
async fn request_deadline_elapsed(err: BoxError) -> Response<Body> {
    if err.is::<Elapsed>() {
        tracing::warn!("Request deadline elapsed before an upstream answered");
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
    }
    response::service_unavailable()
}
