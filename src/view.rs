//! Aggregation Views
//!
//! Read path over the sink and registry: the relations exposed to the query
//! layer. Reads are pure; once a merge returns, a subsequent read observes
//! the updated value. Point lookups on keys that never flushed return the
//! zero row.

use crate::counters::CounterSet;
use crate::registry::ProcessRegistry;
use crate::sink::{QueryStatsKey, StatsSink};
use crate::unit::{UnitId, UnitKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One row of the process-level stats relation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcStatsRow {
    pub unit_id: String,
    pub kind: UnitKind,
    pub input_rows: u64,
    pub output_rows: u64,
    pub input_bytes: u64,
    pub processing_time_ms: u64,
    pub errors: u64,
}

/// One row of the query-level stats relation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatsRow {
    pub query_name: String,
    pub kind: UnitKind,
    pub input_rows: u64,
    pub output_rows: u64,
    pub input_bytes: u64,
    pub processing_time_ms: u64,
    pub errors: u64,
}

/// One row of the stream-level ingest stats relation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatsRow {
    pub stream_name: String,
    pub input_rows: u64,
    pub input_batches: u64,
    pub input_bytes: u64,
}

fn proc_row(unit_id: &UnitId, kind: UnitKind, counters: CounterSet) -> ProcStatsRow {
    ProcStatsRow {
        unit_id: unit_id.to_string(),
        kind,
        input_rows: counters.input_rows,
        output_rows: counters.output_rows,
        input_bytes: counters.input_bytes,
        processing_time_ms: counters.processing_time_ms,
        errors: counters.errors,
    }
}

fn query_row(key: &QueryStatsKey, counters: CounterSet) -> QueryStatsRow {
    QueryStatsRow {
        query_name: key.query_name.clone(),
        kind: key.kind,
        input_rows: counters.input_rows,
        output_rows: counters.output_rows,
        input_bytes: counters.input_bytes,
        processing_time_ms: counters.processing_time_ms,
        errors: counters.errors,
    }
}

/// Builder for the three system views
pub struct StatsViews {
    sink: Arc<StatsSink>,
    registry: Arc<ProcessRegistry>,
}

impl StatsViews {
    pub fn new(sink: Arc<StatsSink>, registry: Arc<ProcessRegistry>) -> Self {
        Self { sink, registry }
    }

    /// One row per live execution unit, sorted by unit id. Units that have
    /// not flushed yet appear with zero counters, so the view's cardinality
    /// always matches the registry.
    pub fn list_proc_stats(&self) -> Vec<ProcStatsRow> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|(unit_id, kind)| {
                let counters = self.sink.proc_counters(&unit_id);
                proc_row(&unit_id, kind, counters)
            })
            .collect()
    }

    /// One row per (query, kind) pair with at least one flush, sorted by
    /// query name then kind
    pub fn list_query_stats(&self) -> Vec<QueryStatsRow> {
        let mut rows: Vec<_> = self
            .sink
            .scan_query()
            .into_iter()
            .map(|(key, counters)| query_row(&key, counters))
            .collect();
        rows.sort_by(|a, b| {
            a.query_name
                .cmp(&b.query_name)
                .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
        });
        rows
    }

    /// One row per stream with at least one reported insert, sorted by name
    pub fn list_stream_stats(&self) -> Vec<StreamStatsRow> {
        let mut rows: Vec<_> = self
            .sink
            .scan_stream()
            .into_iter()
            .map(|(stream_name, counters)| StreamStatsRow {
                stream_name,
                input_rows: counters.input_rows,
                input_batches: counters.input_batches,
                input_bytes: counters.input_bytes,
            })
            .collect();
        rows.sort_by(|a, b| a.stream_name.cmp(&b.stream_name));
        rows
    }

    /// Point lookup on the process view; `None` for unregistered units
    pub fn proc_stats(&self, unit_id: &UnitId) -> Option<ProcStatsRow> {
        let kind = self.registry.kind_of(unit_id)?;
        Some(proc_row(unit_id, kind, self.sink.proc_counters(unit_id)))
    }

    /// Point lookup on the query view; the zero row if never flushed
    pub fn query_stats(&self, query_name: &str, kind: UnitKind) -> QueryStatsRow {
        let key = QueryStatsKey::new(query_name, kind);
        query_row(&key, self.sink.query_counters(&key))
    }

    /// Point lookup on the stream view; the zero row if never written
    pub fn stream_stats(&self, stream_name: &str) -> StreamStatsRow {
        let counters = self.sink.stream_counters(stream_name);
        StreamStatsRow {
            stream_name: stream_name.to_string(),
            input_rows: counters.input_rows,
            input_batches: counters.input_batches,
            input_bytes: counters.input_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::CounterSet;

    fn setup() -> (Arc<StatsSink>, Arc<ProcessRegistry>, StatsViews) {
        let sink = Arc::new(StatsSink::in_memory());
        let registry = Arc::new(ProcessRegistry::new());
        let views = StatsViews::new(Arc::clone(&sink), Arc::clone(&registry));
        (sink, registry, views)
    }

    #[test]
    fn test_proc_view_sized_by_registry() {
        let (sink, registry, views) = setup();
        registry.register("worker0".into(), UnitKind::Worker).unwrap();
        registry
            .register("combiner0".into(), UnitKind::Combiner)
            .unwrap();

        // Only the worker has flushed; the combiner still gets a zero row
        sink.merge(
            &"worker0".into(),
            &QueryStatsKey::new("q", UnitKind::Worker),
            &CounterSet {
                input_rows: 42,
                ..Default::default()
            },
        );

        let rows = views.list_proc_stats();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].unit_id, "combiner0");
        assert_eq!(rows[0].input_rows, 0);
        assert_eq!(rows[1].unit_id, "worker0");
        assert_eq!(rows[1].input_rows, 42);
    }

    #[test]
    fn test_query_view_lists_only_flushed_pairs() {
        let (sink, _registry, views) = setup();
        let delta = CounterSet {
            input_rows: 10,
            ..Default::default()
        };

        sink.merge(
            &"worker0".into(),
            &QueryStatsKey::new("b_query", UnitKind::Worker),
            &delta,
        );
        sink.merge(
            &"combiner0".into(),
            &QueryStatsKey::new("a_query", UnitKind::Combiner),
            &delta,
        );

        let rows = views.list_query_stats();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].query_name, "a_query");
        assert_eq!(rows[1].query_name, "b_query");
    }

    #[test]
    fn test_reads_are_idempotent() {
        let (sink, registry, views) = setup();
        registry.register("worker0".into(), UnitKind::Worker).unwrap();
        sink.merge(
            &"worker0".into(),
            &QueryStatsKey::new("q", UnitKind::Worker),
            &CounterSet {
                input_rows: 5,
                ..Default::default()
            },
        );

        assert_eq!(views.list_proc_stats(), views.list_proc_stats());
        assert_eq!(views.list_query_stats(), views.list_query_stats());
    }

    #[test]
    fn test_point_lookups_on_absent_keys() {
        let (_sink, registry, views) = setup();
        registry.register("worker0".into(), UnitKind::Worker).unwrap();

        assert!(views.proc_stats(&"ghost".into()).is_none());

        let row = views.query_stats("never_flushed", UnitKind::Worker);
        assert_eq!(row.input_rows, 0);
        assert_eq!(row.query_name, "never_flushed");

        let row = views.proc_stats(&"worker0".into()).unwrap();
        assert_eq!(row.input_rows, 0);
    }
}
