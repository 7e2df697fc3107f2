//! Flush Scheduler
//!
//! Per-accumulator policy deciding when pending counters must be pushed to
//! the sink. Two triggers share this state: the traffic-driven check on every
//! recorded batch, and the background timer sweep that fires even when
//! traffic stops. Under sustained load the interval throttles flushes to at
//! most roughly one per interval per accumulator, bounding write
//! amplification; under silence the sweep bounds staleness to one interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Interval-based flush policy for one accumulator
#[derive(Debug)]
pub struct FlushScheduler {
    /// Monotonic reference point for `last_flush_ms`
    epoch: Instant,

    /// Milliseconds since `epoch` of the last flush (starts at creation time)
    last_flush_ms: AtomicU64,

    /// Forced flush interval in milliseconds
    interval_ms: u64,
}

impl FlushScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            last_flush_ms: AtomicU64::new(0),
            interval_ms: interval.as_millis() as u64,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Traffic-driven check: true if a full interval has elapsed since the
    /// last flush. On success the flush timestamp advances atomically, so
    /// when the timer sweep races with the batch path only one of them wins
    /// the interval.
    pub fn should_flush(&self) -> bool {
        let now = self.now_ms();
        let last = self.last_flush_ms.load(Ordering::Acquire);
        if now.saturating_sub(last) < self.interval_ms {
            return false;
        }
        self.last_flush_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// True if a full interval has elapsed, without claiming the flush
    pub fn is_due(&self) -> bool {
        let last = self.last_flush_ms.load(Ordering::Acquire);
        self.now_ms().saturating_sub(last) >= self.interval_ms
    }

    /// Record an out-of-band flush (timer sweep or unit retirement)
    pub fn mark_flushed(&self) {
        self.last_flush_ms.store(self.now_ms(), Ordering::Release);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
