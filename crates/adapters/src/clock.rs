use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use ports::secondary::clock::Clock;

/// Wall clock measured from process-local start.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Clock driven by recorded packet timestamps.
///
/// Cloned handles share the same instant: the replay source advances it
/// and the pipeline reads it.
#[derive(Debug, Clone, Default)]
pub struct ReplayClock {
    now: Arc<AtomicU64>,
}

impl ReplayClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `ns`. Earlier timestamps are ignored.
    pub fn advance_to(&self, ns: u64) {
        self.now.fetch_max(ns, Ordering::AcqRel);
    }
}

impl Clock for ReplayClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
