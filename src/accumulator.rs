//! Local Accumulator
//!
//! Per-unit, per-query counter accumulation. The owning execution unit's task
//! is the only caller of `record_batch`, so the hot path is lock-free; the
//! background sweep and unit retirement share the same atomic read-and-reset
//! flush, so a batch landing at flush time is never lost or double-counted.

use crate::counters::{Additive, CounterSet, LocalCounters};
use crate::scheduler::FlushScheduler;
use crate::sink::{QueryStatsKey, StatsSink};
use crate::unit::{UnitId, UnitKind};
use std::time::Duration;
use tracing::debug;

/// Accumulates micro-batch counters for one (unit, query) pair
pub struct LocalAccumulator {
    unit_id: UnitId,
    query_key: QueryStatsKey,
    counters: LocalCounters,
    scheduler: FlushScheduler,
}

impl LocalAccumulator {
    pub fn new(
        unit_id: UnitId,
        kind: UnitKind,
        query_name: impl Into<String>,
        forced_flush_interval: Duration,
    ) -> Self {
        Self {
            unit_id,
            query_key: QueryStatsKey::new(query_name, kind),
            counters: LocalCounters::new(),
            scheduler: FlushScheduler::new(forced_flush_interval),
        }
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    pub fn query_key(&self) -> &QueryStatsKey {
        &self.query_key
    }

    /// Account one completed micro-batch, then flush to the sink if the
    /// forced interval has elapsed since the last flush.
    pub fn record_batch(
        &self,
        input_rows: u64,
        output_rows: u64,
        input_bytes: u64,
        elapsed_ms: u64,
        had_error: bool,
        sink: &StatsSink,
    ) {
        self.counters
            .record(input_rows, output_rows, input_bytes, elapsed_ms, had_error);
        if self.scheduler.should_flush() {
            self.flush(sink);
        }
    }

    /// Take the pending delta and merge it into the sink. Returns the delta,
    /// which is zero when nothing accumulated since the last flush.
    pub fn flush(&self, sink: &StatsSink) -> CounterSet {
        let delta = self.counters.take();
        if delta.is_zero() {
            return delta;
        }
        sink.merge(&self.unit_id, &self.query_key, &delta);
        debug!(
            unit = %self.unit_id,
            query = %self.query_key.query_name,
            input_rows = delta.input_rows,
            "flushed pending counters"
        );
        delta
    }

    /// Timer-sweep entry point: flush any pending delta and reset the
    /// scheduler clock so the traffic path stays throttled.
    pub fn sweep(&self, sink: &StatsSink) -> bool {
        if self.counters.is_idle() {
            return false;
        }
        let delta = self.flush(sink);
        self.scheduler.mark_flushed();
        !delta.is_zero()
    }

    /// Pending counters not yet handed to the sink
    pub fn pending(&self) -> CounterSet {
        self.counters.snapshot()
    }
}
