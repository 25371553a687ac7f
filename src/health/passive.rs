//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Observe forwarding outcomes on the request path
//! - Mark a target down on the first forwarding failure
//!
//! # Design Decisions
//! - Only network errors and timeouts count; upstream status codes never do
//! - No threshold: the next health tick is the only way back up

use crate::dispatch::forward::ForwardError;
use crate::load_balancer::UpstreamTarget;

/// Record a forwarding failure against `target`, flipping it to not-alive.
///
/// Returns true when this call performed the alive → down transition.
pub fn report_forwarding_failure(target: &UpstreamTarget, error: &ForwardError) -> bool {
    let was_alive = target.set_alive(false);
    if was_alive {
        tracing::warn!(upstream = %target, error = %error, "Marking upstream down after forwarding failure");
    } else {
        tracing::debug!(upstream = %target, error = %error, "Forwarding failed on upstream already marked down");
    }
    was_alive
}
