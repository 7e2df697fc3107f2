//! Stats Sink
//!
//! The shared aggregation target every execution unit flushes into. Deltas
//! are merged additively into three logical tables: process-level stats (one
//! row per unit), query-level stats (one row per query and process kind), and
//! stream-level ingest stats (one row per stream). Merges into the same row
//! are serialized per key; the final state of a row is independent of the
//! order concurrent flushes arrive in.

use crate::counters::{CounterSet, StreamCounters};
use crate::store::{MemoryTable, StatsTable};
use crate::unit::{UnitId, UnitKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Aggregation key for query-level stats: all units of one kind executing the
/// same query contribute to the same row
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryStatsKey {
    pub query_name: String,
    pub kind: UnitKind,
}

impl QueryStatsKey {
    pub fn new(query_name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            query_name: query_name.into(),
            kind,
        }
    }
}

/// Concurrently-writable sink for flushed counter deltas
pub struct StatsSink {
    proc: Arc<dyn StatsTable<UnitId, CounterSet>>,
    query: Arc<dyn StatsTable<QueryStatsKey, CounterSet>>,
    stream: Arc<dyn StatsTable<String, StreamCounters>>,
}

impl StatsSink {
    /// Sink over in-process tables
    pub fn in_memory() -> Self {
        Self {
            proc: Arc::new(MemoryTable::new()),
            query: Arc::new(MemoryTable::new()),
            stream: Arc::new(MemoryTable::new()),
        }
    }

    /// Sink over caller-provided table backends
    pub fn new(
        proc: Arc<dyn StatsTable<UnitId, CounterSet>>,
        query: Arc<dyn StatsTable<QueryStatsKey, CounterSet>>,
        stream: Arc<dyn StatsTable<String, StreamCounters>>,
    ) -> Self {
        Self {
            proc,
            query,
            stream,
        }
    }

    /// Merge one flushed delta into both the process and query tables.
    /// Unknown keys are created as zero rows first; there is no "not found".
    pub fn merge(&self, unit_id: &UnitId, query_key: &QueryStatsKey, delta: &CounterSet) {
        self.proc.upsert(unit_id, delta);
        self.query.upsert(query_key, delta);
        debug!(
            unit = %unit_id,
            query = %query_key.query_name,
            kind = %query_key.kind,
            input_rows = delta.input_rows,
            output_rows = delta.output_rows,
            "merged flush delta"
        );
    }

    /// Merge ingest-side counters for one stream
    pub fn merge_stream(&self, stream_name: &str, delta: &StreamCounters) {
        self.stream.upsert(&stream_name.to_string(), delta);
    }

    /// Cumulative counters for one unit; zero if it has never flushed
    pub fn proc_counters(&self, unit_id: &UnitId) -> CounterSet {
        self.proc.get(unit_id).unwrap_or_default()
    }

    /// Cumulative counters for one (query, kind); zero if never flushed
    pub fn query_counters(&self, key: &QueryStatsKey) -> CounterSet {
        self.query.get(key).unwrap_or_default()
    }

    /// Cumulative ingest counters for one stream; zero if never written
    pub fn stream_counters(&self, stream_name: &str) -> StreamCounters {
        self.stream
            .get(&stream_name.to_string())
            .unwrap_or_default()
    }

    pub fn scan_proc(&self) -> Vec<(UnitId, CounterSet)> {
        self.proc.scan()
    }

    pub fn scan_query(&self) -> Vec<(QueryStatsKey, CounterSet)> {
        self.query.scan()
    }

    pub fn scan_stream(&self) -> Vec<(String, StreamCounters)> {
        self.stream.scan()
    }

    /// Number of distinct (query, kind) rows that have received a flush
    pub fn query_row_count(&self) -> usize {
        self.query.len()
    }
}
