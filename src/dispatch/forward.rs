//! Forwarding a request to one upstream target.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the target (base path joined, query kept)
//! - Strip hop-by-hop headers in both directions
//! - Enforce a per-attempt deadline
//! - Stream the upstream response back untouched otherwise

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Response, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::time;

use crate::load_balancer::UpstreamTarget;

/// A single forwarding attempt failed before a response arrived.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("cannot build upstream URI: {0}")]
    InvalidUri(String),
}

/// Sends one request to one target.
///
/// Any `Ok` response, whatever its status, ends the dispatch; `Err` triggers failover.
pub trait Forwarder: Send + Sync + 'static {
    fn forward(
        &self,
        target: &UpstreamTarget,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, ForwardError>> + Send;
}

/// Forwarder backed by a pooled hyper client.
#[derive(Clone)]
pub struct HyperForwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HyperForwarder {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self { client, timeout }
    }
}

impl Forwarder for HyperForwarder {
    fn forward(
        &self,
        target: &UpstreamTarget,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, ForwardError>> + Send {
        let prepared = prepare_request(target, request);
        let client = self.client.clone();
        let timeout = self.timeout;

        async move {
            let request = prepared?;
            match time::timeout(timeout, client.request(request)).await {
                Ok(Ok(response)) => {
                    let (mut parts, body) = response.into_parts();
                    strip_hop_by_hop(&mut parts.headers);
                    Ok(Response::from_parts(parts, Body::new(body)))
                }
                Ok(Err(e)) => Err(ForwardError::Upstream(Box::new(e))),
                Err(_) => Err(ForwardError::Timeout(timeout)),
            }
        }
    }
}

fn prepare_request(
    target: &UpstreamTarget,
    request: Request<Body>,
) -> Result<Request<Body>, ForwardError> {
    let (mut parts, body) = request.into_parts();
    parts.uri = upstream_uri(target, &parts.uri)?;
    strip_hop_by_hop(&mut parts.headers);
    Ok(Request::from_parts(parts, body))
}

/// Map an inbound URI onto `target`: scheme and authority replaced, paths joined,
/// target query and inbound query concatenated.
pub fn upstream_uri(target: &UpstreamTarget, incoming: &Uri) -> Result<Uri, ForwardError> {
    let base = target.url();
    let mut uri = format!(
        "{}://{}{}",
        base.scheme(),
        target.authority(),
        join_paths(base.path(), incoming.path())
    );

    match (base.query(), incoming.query()) {
        (Some(a), Some(b)) if !a.is_empty() => {
            uri.push('?');
            uri.push_str(a);
            uri.push('&');
            uri.push_str(b);
        }
        (Some(q), None) | (_, Some(q)) => {
            uri.push('?');
            uri.push_str(q);
        }
        (None, None) => {}
    }

    uri.parse::<Uri>()
        .map_err(|e| ForwardError::InvalidUri(e.to_string()))
}

/// Join two paths with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}
