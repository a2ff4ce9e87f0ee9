use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe counter, used to generate correlation ids.
///
/// The counter holds the last value handed out. Every call to [`next`](#method.next) advances it
/// by the step first, so a counter created with `start` returns `start + step` first.
#[derive(Debug)]
pub struct AtomicCount {
    count: AtomicU64,
    step: u64,
}

impl Default for AtomicCount {
    fn default() -> AtomicCount {
        AtomicCount::new(0)
    }
}

impl AtomicCount {
    /// Create a counter at `start`, counting in steps of 1.
    pub fn new(start: u64) -> AtomicCount {
        AtomicCount::with_step(start, 1)
    }

    /// Create a counter at `start`, counting in steps of `step`.
    pub fn with_step(start: u64, step: u64) -> AtomicCount {
        AtomicCount {
            count: AtomicU64::new(start),
            step,
        }
    }

    /// Advance the counter and return its new value.
    pub fn next(&self) -> u64 {
        self.count
            .fetch_add(self.step, Ordering::SeqCst)
            .wrapping_add(self.step)
    }
}
