//! Exponential backoff with jitter for same-target retries.

use std::time::Duration;
use rand::Rng;

/// Delay before retry number `retry` (1-based) against the same target.
///
/// `base_ms * 2^(retry - 1)`, capped at `max_ms`, plus up to 10% jitter.
pub fn calculate_backoff(retry: u32, base_ms: u64, max_ms: u64) -> Duration {
    if retry == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(retry - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
