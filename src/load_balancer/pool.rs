//! Server pool management.
//!
//! # Responsibilities
//! - Own the fixed, ordered set of upstream targets
//! - Rotate through them with a lock-free cursor
//! - Skip targets currently marked down

use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::load_balancer::{round_robin::RotationCursor, target::UpstreamTarget};

/// Selection and construction failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was built with no targets.
    #[error("server pool has no upstream targets configured")]
    PoolEmpty,
    /// A full scan found every target marked down.
    #[error("there is no alive upstream server")]
    NoAliveUpstream,
}

/// Fixed set of upstream targets plus the rotation cursor.
#[derive(Debug)]
pub struct ServerPool {
    targets: Vec<Arc<UpstreamTarget>>,
    cursor: RotationCursor,
}

impl ServerPool {
    /// Build a pool from targets. Fails with `PoolEmpty` on an empty list.
    pub fn new(targets: Vec<UpstreamTarget>) -> Result<Self, PoolError> {
        if targets.is_empty() {
            return Err(PoolError::PoolEmpty);
        }
        Ok(Self {
            targets: targets.into_iter().map(Arc::new).collect(),
            cursor: RotationCursor::new(),
        })
    }

    /// Build a pool from already validated upstream URLs.
    pub fn from_urls(urls: impl IntoIterator<Item = Url>) -> Result<Self, PoolError> {
        Self::new(urls.into_iter().map(UpstreamTarget::new).collect())
    }

    /// Number of configured targets.
    pub fn size(&self) -> usize {
        self.targets.len()
    }

    /// All targets in configuration order.
    pub fn targets(&self) -> &[Arc<UpstreamTarget>] {
        &self.targets
    }

    /// Number of targets currently marked alive.
    pub fn alive_count(&self) -> usize {
        self.targets.iter().filter(|t| t.is_alive()).count()
    }

    /// Advance the cursor and return the resulting index.
    pub fn next_index(&self) -> usize {
        self.cursor.next_index(self.size())
    }

    /// Select the next alive target in rotation.
    ///
    /// Scans at most `size()` slots starting at `next_index()`. When the winner
    /// is not the starting slot, the cursor is moved onto it.
    pub fn next_alive_target(&self) -> Result<Arc<UpstreamTarget>, PoolError> {
        let len = self.size();
        let start = self.next_index();

        for offset in 0..len {
            let index = (start + offset) % len;
            let target = &self.targets[index];
            if target.is_alive() {
                if offset != 0 {
                    self.cursor.advance_to(index);
                }
                return Ok(target.clone());
            }
        }

        tracing::debug!(targets = len, "No alive upstream found in full scan");
        Err(PoolError::NoAliveUpstream)
    }

    /// Current raw cursor value.
    pub fn cursor(&self) -> usize {
        self.cursor.raw()
    }
}
