//! Responses the balancer produces itself.
//!
//! # Design Decisions
//! - Plain-text bodies only; internal error detail is logged, never sent
//! - Upstream responses are never rewritten here

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;

/// Body of every 503 the balancer emits.
pub const NO_UPSTREAM_BODY: &str = "there is no alive upstream server";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// No alive target, or the attempt cap was exhausted.
pub fn service_unavailable() -> Response<Body> {
    plain(StatusCode::SERVICE_UNAVAILABLE, NO_UPSTREAM_BODY)
}

/// The request body could not be buffered for replay.
pub fn payload_too_large() -> Response<Body> {
    plain(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
}

/// The request body could not be read from the client.
pub fn bad_request() -> Response<Body> {
    plain(StatusCode::BAD_REQUEST, "request body could not be read")
}

fn plain(status: StatusCode, body: &'static str) -> Response<Body> {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}
