//! Counter Sets
//!
//! The accumulators every execution unit maintains per logical query, and the
//! additive-merge trait the sink tables are built on. `CounterSet` is the
//! plain value carried in flush deltas and sink rows; `LocalCounters` is the
//! atomic hot-path variant owned by a unit's accumulator.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Values that merge additively: the sink's row type requirement.
///
/// Merging must be commutative and associative so the final state of a row is
/// independent of the order concurrent flushes arrive in.
pub trait Additive: Default + Clone {
    /// Add `delta` into `self`, field by field
    fn merge(&mut self, delta: &Self);

    /// True if every counter is zero
    fn is_zero(&self) -> bool;
}

/// Execution counters for one unit working on one logical query
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSet {
    /// Rows consumed from the stream
    pub input_rows: u64,

    /// Rows produced (partial results for workers, group rows for combiners)
    pub output_rows: u64,

    /// Bytes consumed from the stream
    pub input_bytes: u64,

    /// Time spent processing micro-batches
    pub processing_time_ms: u64,

    /// Micro-batches that ended in an error
    pub errors: u64,
}

impl Additive for CounterSet {
    fn merge(&mut self, delta: &CounterSet) {
        self.input_rows += delta.input_rows;
        self.output_rows += delta.output_rows;
        self.input_bytes += delta.input_bytes;
        self.processing_time_ms += delta.processing_time_ms;
        self.errors += delta.errors;
    }

    fn is_zero(&self) -> bool {
        *self == CounterSet::default()
    }
}

/// Ingest-side counters for one stream, reported by the insert path
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCounters {
    /// Rows appended to the stream
    pub input_rows: u64,

    /// Micro-batches the rows were grouped into
    pub input_batches: u64,

    /// Bytes appended to the stream
    pub input_bytes: u64,
}

impl StreamCounters {
    pub fn new(input_rows: u64, input_batches: u64, input_bytes: u64) -> Self {
        Self {
            input_rows,
            input_batches,
            input_bytes,
        }
    }
}

impl Additive for StreamCounters {
    fn merge(&mut self, delta: &StreamCounters) {
        self.input_rows += delta.input_rows;
        self.input_batches += delta.input_batches;
        self.input_bytes += delta.input_bytes;
    }

    fn is_zero(&self) -> bool {
        *self == StreamCounters::default()
    }
}

/// Hot-path counters owned by a single unit's accumulator.
///
/// The owning unit is the only logical writer, but the background flush
/// sweeper may take a delta concurrently, so every field is an atomic and
/// `take` swaps each field to zero. A batch recorded in the middle of a
/// `take` may split across two deltas; it is never lost or counted twice.
#[derive(Debug, Default)]
pub struct LocalCounters {
    input_rows: AtomicU64,
    output_rows: AtomicU64,
    input_bytes: AtomicU64,
    processing_time_ms: AtomicU64,
    errors: AtomicU64,
}

impl LocalCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one completed micro-batch
    pub fn record(
        &self,
        input_rows: u64,
        output_rows: u64,
        input_bytes: u64,
        elapsed_ms: u64,
        had_error: bool,
    ) {
        self.input_rows.fetch_add(input_rows, Ordering::Relaxed);
        self.output_rows.fetch_add(output_rows, Ordering::Relaxed);
        self.input_bytes.fetch_add(input_bytes, Ordering::Relaxed);
        self.processing_time_ms
            .fetch_add(elapsed_ms, Ordering::Relaxed);
        if had_error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Atomically read-and-reset: the delta handed to the sink on flush
    pub fn take(&self) -> CounterSet {
        CounterSet {
            input_rows: self.input_rows.swap(0, Ordering::AcqRel),
            output_rows: self.output_rows.swap(0, Ordering::AcqRel),
            input_bytes: self.input_bytes.swap(0, Ordering::AcqRel),
            processing_time_ms: self.processing_time_ms.swap(0, Ordering::AcqRel),
            errors: self.errors.swap(0, Ordering::AcqRel),
        }
    }

    /// Read the pending values without resetting them
    pub fn snapshot(&self) -> CounterSet {
        CounterSet {
            input_rows: self.input_rows.load(Ordering::Acquire),
            output_rows: self.output_rows.load(Ordering::Acquire),
            input_bytes: self.input_bytes.load(Ordering::Acquire),
            processing_time_ms: self.processing_time_ms.load(Ordering::Acquire),
            errors: self.errors.load(Ordering::Acquire),
        }
    }

    /// True if nothing has accumulated since the last take
    pub fn is_idle(&self) -> bool {
        self.snapshot().is_zero()
    }
}
