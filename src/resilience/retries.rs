//! Per-request attempt tracking.
//!
//! # Responsibilities
//! - Count targets tried for one inbound request (`attempts`)
//! - Count tries against the current target (`retry`)
//! - Enforce both caps
//!
//! # Design Decisions
//! - Lives on the dispatcher's stack for one request; never shared or persisted
//! - `attempts` starts at 1: the first selection is already an attempt

/// Attempt and retry counters for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptContext {
    attempts: u32,
    retry: u32,
    max_attempts: u32,
    max_retries: u32,
}

impl AttemptContext {
    pub fn new(max_attempts: u32, max_retries: u32) -> Self {
        Self {
            attempts: 1,
            retry: 0,
            max_attempts: max_attempts.max(1),
            max_retries,
        }
    }

    /// Targets tried so far, including the current one.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Retries made against the current target.
    pub fn retry(&self) -> u32 {
        self.retry
    }

    /// Consume one same-target retry. Returns false once the per-target cap is reached.
    pub fn begin_retry(&mut self) -> bool {
        if self.retry >= self.max_retries {
            return false;
        }
        self.retry += 1;
        true
    }

    /// Move on to a new target. Returns false once the attempt cap is reached.
    pub fn next_attempt(&mut self) -> bool {
        if self.attempts >= self.max_attempts {
            return false;
        }
        self.attempts += 1;
        self.retry = 0;
        true
    }
}
