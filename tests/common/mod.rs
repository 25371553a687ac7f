//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Bytes, http::Uri, Router};
use tokio::net::TcpListener;

use rr_balancer::{BalancerConfig, HttpServer, ServerPool, Shutdown};

/// Start a backend that answers every request with `name`.
pub async fn start_named_backend(name: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move || async move { name });
    serve(TcpListener::bind("127.0.0.1:0").await.unwrap(), app)
}

/// Start a named backend on a specific address.
pub async fn start_named_backend_at(addr: SocketAddr, name: &'static str) {
    let app = Router::new().fallback(move || async move { name });
    serve(TcpListener::bind(addr).await.unwrap(), app);
}

/// Start a backend that echoes the request URI and body as `"<uri>|<body>"`.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new().fallback(|uri: Uri, body: Bytes| async move {
        format!("{}|{}", uri, String::from_utf8_lossy(&body))
    });
    serve(TcpListener::bind("127.0.0.1:0").await.unwrap(), app)
}

fn serve(listener: TcpListener, app: Router) -> SocketAddr {
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub fn dead_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// Config for a balancer on an ephemeral port with health checks off.
pub fn config(upstreams: &[SocketAddr]) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstreams = upstreams.iter().copied().map(url).collect();
    config.health_check.enabled = false;
    config.dispatch.forward_timeout_secs = 5;
    config
}

pub struct RunningBalancer {
    pub addr: SocketAddr,
    pub pool: Arc<ServerPool>,
    pub shutdown: Shutdown,
}

impl RunningBalancer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a balancer and wait until it accepts connections.
pub async fn start_balancer(config: BalancerConfig) -> RunningBalancer {
    let server = HttpServer::new(config).unwrap();
    let pool = server.pool();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    RunningBalancer {
        addr,
        pool,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
