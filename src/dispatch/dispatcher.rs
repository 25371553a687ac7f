//! Request dispatcher: select, forward, fail over.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Response, Uri, Version};
use futures_util::StreamExt;

use crate::config::DispatchConfig;
use crate::dispatch::forward::{ForwardError, Forwarder};
use crate::health::passive::report_forwarding_failure;
use crate::http::{response, RequestIdExt};
use crate::load_balancer::{ServerPool, UpstreamTarget};
use crate::resilience::{backoff::calculate_backoff, AttemptContext};

/// Inbound request with its body buffered so each attempt can replay it.
#[derive(Debug, Clone)]
pub struct ReplayableRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl ReplayableRequest {
    pub fn new(
        method: Method,
        uri: Uri,
        version: Version,
        mut headers: HeaderMap,
        body: Bytes,
        client_addr: Option<SocketAddr>,
    ) -> Self {
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut headers, addr);
        }
        Self {
            method,
            uri,
            version,
            headers,
            body,
        }
    }

    /// Build a fresh request for one attempt.
    pub fn to_request(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        request
    }
}

const X_FORWARDED_FOR: header::HeaderName = header::HeaderName::from_static("x-forwarded-for");

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let client_ip = addr.ip().to_string();
    let value = match headers
        .get(&X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
    {
        Some(prior) => format!("{}, {}", prior, client_ip),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(&X_FORWARDED_FOR, value);
    }
}

enum BodyError {
    TooLarge,
    Read(axum::Error),
}

/// Collect the inbound body, stopping as soon as it grows past `limit`.
async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, BodyError> {
    let mut stream = body.into_data_stream();
    let mut buffered = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyError::Read)?;
        if buffered.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge);
        }
        buffered.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buffered))
}

/// HTTP-facing entry point: pulls targets from the pool and forwards with failover.
pub struct RequestDispatcher<F> {
    pool: Arc<ServerPool>,
    forwarder: F,
    config: DispatchConfig,
}

impl<F: Forwarder> RequestDispatcher<F> {
    pub fn new(pool: Arc<ServerPool>, forwarder: F, config: DispatchConfig) -> Self {
        Self {
            pool,
            forwarder,
            config,
        }
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Handle one inbound request end to end.
    ///
    /// Only a terminal "no usable target" is visible to the caller, as a 503.
    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let request_id = request.request_id().to_string();
        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let (parts, body) = request.into_parts();
        let body = match buffer_body(body, self.config.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(BodyError::TooLarge) => {
                tracing::warn!(request_id = %request_id, limit = self.config.max_body_bytes, "Request body too large");
                return response::payload_too_large();
            }
            Err(BodyError::Read(e)) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
                return response::bad_request();
            }
        };
        let replay = ReplayableRequest::new(
            parts.method,
            parts.uri,
            parts.version,
            parts.headers,
            body,
            client_addr,
        );

        let mut ctx = AttemptContext::new(self.config.max_attempts, self.config.retries_per_target);

        loop {
            let target = match self.pool.next_alive_target() {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!(request_id = %request_id, attempt = ctx.attempts(), error = %e, "No upstream available");
                    return response::service_unavailable();
                }
            };

            tracing::debug!(request_id = %request_id, attempt = ctx.attempts(), upstream = %target, "Forwarding request");

            match self.forward_with_retries(&target, &replay, &mut ctx).await {
                Ok(response) => return response,
                Err(e) => {
                    report_forwarding_failure(&target, &e);
                    if !ctx.next_attempt() {
                        tracing::warn!(
                            request_id = %request_id,
                            attempts = ctx.attempts(),
                            error = %e,
                            "Attempt cap exhausted"
                        );
                        return response::service_unavailable();
                    }
                }
            }
        }
    }

    async fn forward_with_retries(
        &self,
        target: &UpstreamTarget,
        replay: &ReplayableRequest,
        ctx: &mut AttemptContext,
    ) -> Result<Response<Body>, ForwardError> {
        loop {
            match self.forwarder.forward(target, replay.to_request()).await {
                Ok(response) => return Ok(response),
                Err(e) if ctx.begin_retry() => {
                    let delay = calculate_backoff(
                        ctx.retry(),
                        self.config.retry_base_delay_ms,
                        self.config.retry_max_delay_ms,
                    );
                    tracing::debug!(upstream = %target, retry = ctx.retry(), delay = ?delay, error = %e, "Retrying same upstream");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::collections::HashSet;
    use std::future::Future;
    use std::sync::Mutex;
    use url::Url;

    /// Forwarder that fails for a fixed set of ports and echoes the port otherwise.
    #[derive(Default)]
    struct ScriptedForwarder {
        failing: HashSet<u16>,
        calls: Mutex<Vec<u16>>,
        // Liveness of the called target at call time, to check mark-down ordering.
        seen_alive: Mutex<Vec<bool>>,
        bodies: Mutex<Vec<Bytes>>,
    }

    impl ScriptedForwarder {
        fn failing(ports: &[u16]) -> Self {
            Self {
                failing: ports.iter().copied().collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<u16> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Forwarder for ScriptedForwarder {
        fn forward(
            &self,
            target: &UpstreamTarget,
            request: Request<Body>,
        ) -> impl Future<Output = Result<Response<Body>, ForwardError>> + Send {
            let port = target.url().port().unwrap();
            self.calls.lock().unwrap().push(port);
            self.seen_alive.lock().unwrap().push(target.is_alive());
            let fail = self.failing.contains(&port);

            async move {
                let body = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
                self.bodies.lock().unwrap().push(body);
                if fail {
                    Err(ForwardError::Upstream("connection refused".into()))
                } else {
                    Ok(Response::new(Body::from(port.to_string())))
                }
            }
        }
    }

    fn pool(ports: &[u16]) -> Arc<ServerPool> {
        Arc::new(
            ServerPool::from_urls(
                ports
                    .iter()
                    .map(|p| Url::parse(&format!("http://127.0.0.1:{}", p)).unwrap()),
            )
            .unwrap(),
        )
    }

    fn dispatcher(ports: &[u16], failing: &[u16], config: DispatchConfig) -> RequestDispatcher<ScriptedForwarder> {
        RequestDispatcher::new(pool(ports), ScriptedForwarder::failing(failing), config)
    }

    fn get() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn rotates_across_targets() {
        let d = dispatcher(&[1, 2, 3], &[], DispatchConfig::default());
        let mut bodies = Vec::new();
        for _ in 0..6 {
            bodies.push(body_string(d.dispatch(get()).await).await);
        }
        assert_eq!(bodies, vec!["2", "3", "1", "2", "3", "1"]);
    }

    #[tokio::test]
    async fn failed_target_marked_down_before_reselection() {
        // First selection lands on port 2, which fails.
        let d = dispatcher(&[1, 2, 3], &[2], DispatchConfig::default());

        let response = d.dispatch(get()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "3");

        assert_eq!(d.forwarder.calls(), vec![2, 3]);
        assert!(!d.pool().targets()[1].is_alive());

        // Subsequent requests never reach the failed target.
        for _ in 0..6 {
            d.dispatch(get()).await;
        }
        assert_eq!(d.forwarder.calls().iter().filter(|&&p| p == 2).count(), 1);
    }

    #[tokio::test]
    async fn attempt_cap_yields_503() {
        let d = dispatcher(&[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5], DispatchConfig::default());

        let response = d.dispatch(get()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(response).await, response::NO_UPSTREAM_BODY);

        assert_eq!(d.forwarder.calls().len(), 3);
        assert_eq!(d.pool().alive_count(), 2);
        assert!(d.forwarder.seen_alive.lock().unwrap().iter().all(|&alive| alive));
    }

    #[tokio::test]
    async fn no_alive_target_fails_without_forwarding() {
        let d = dispatcher(&[1, 2], &[], DispatchConfig::default());
        for t in d.pool().targets() {
            t.set_alive(false);
        }

        let response = d.dispatch(get()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert!(d.forwarder.calls().is_empty());
    }

    #[tokio::test]
    async fn pool_exhausted_mid_request_stops_early() {
        let d = dispatcher(&[1, 2], &[1, 2], DispatchConfig::default());

        let response = d.dispatch(get()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(d.forwarder.calls(), vec![2, 1]);
    }

    #[tokio::test]
    async fn same_target_retries_before_failover() {
        let config = DispatchConfig {
            retries_per_target: 2,
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 5,
            ..Default::default()
        };
        let d = dispatcher(&[1, 2, 3], &[2], config);

        let response = d.dispatch(get()).await;
        assert_eq!(body_string(response).await, "3");
        assert_eq!(d.forwarder.calls(), vec![2, 2, 2, 3]);
    }

    #[tokio::test]
    async fn body_replayed_on_every_attempt() {
        let d = dispatcher(&[1, 2, 3], &[2], DispatchConfig::default());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/submit")
            .body(Body::from("payload"))
            .unwrap();

        d.dispatch(request).await;

        let bodies = d.forwarder.bodies.lock().unwrap().clone();
        assert_eq!(bodies, vec![Bytes::from("payload"), Bytes::from("payload")]);
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let config = DispatchConfig {
            max_body_bytes: 4,
            ..Default::default()
        };
        let d = dispatcher(&[1], &[], config);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from("too large"))
            .unwrap();

        let response = d.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(d.forwarder.calls().is_empty());
    }

    #[tokio::test]
    async fn body_at_limit_is_accepted() {
        let config = DispatchConfig {
            max_body_bytes: 4,
            ..Default::default()
        };
        let d = dispatcher(&[1], &[], config);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from("four"))
            .unwrap();

        assert_eq!(d.dispatch(request).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn aborted_body_is_bad_request() {
        let d = dispatcher(&[1], &[], DispatchConfig::default());
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from("partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
        ];
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();

        let response = d.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(d.forwarder.calls().is_empty());
    }

    #[test]
    fn forwarded_for_is_appended() {
        let mut headers = HeaderMap::new();
        headers.insert(&X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.9"));
        let replay = ReplayableRequest::new(
            Method::GET,
            Uri::from_static("/"),
            Version::HTTP_11,
            headers,
            Bytes::new(),
            Some("10.1.2.3:5555".parse().unwrap()),
        );

        let request = replay.to_request();
        assert_eq!(request.headers()[&X_FORWARDED_FOR], "203.0.113.9, 10.1.2.3");
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_pool() {
        let d = Arc::new(dispatcher(&[1, 2, 3], &[], DispatchConfig::default()));
        let handles: Vec<_> = (0..30)
            .map(|_| {
                let d = d.clone();
                tokio::spawn(async move { d.dispatch(get()).await.status() })
            })
            .collect();
        for h in handles {
            assert_eq!(h.await.unwrap(), StatusCode::OK);
        }

        let calls = d.forwarder.calls();
        for port in 1..=3 {
            assert_eq!(calls.iter().filter(|&&p| p == port).count(), 10);
        }
    }
}
