//! Round-robin rotation cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared rotation counter.
/// Only ever moved forward by `fetch_add`, or repositioned by `advance_to`.
#[derive(Debug, Default)]
pub struct RotationCursor {
    value: AtomicUsize,
}

impl RotationCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically increment and return the new raw value.
    /// Wraps at `usize::MAX`.
    pub fn advance(&self) -> usize {
        self.value.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Next selection index in `0..len`.
    ///
    /// `len` must be non-zero.
    pub fn next_index(&self, len: usize) -> usize {
        self.advance() % len
    }

    /// Reposition the cursor so the next caller continues past `index`.
    ///
    /// A plain store: a concurrent `advance` may overwrite it, which only
    /// shifts rotation by one slot.
    pub fn advance_to(&self, index: usize) {
        self.value.store(index, Ordering::Relaxed);
    }

    /// Current raw value.
    pub fn raw(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }
}
