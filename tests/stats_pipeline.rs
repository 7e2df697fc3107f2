//! End-to-end statistics collection scenario: two continuous queries fed by
//! round-robin micro-batches across two workers and one combiner, with the
//! background sweeper bounding staleness.

use pipeflow_stats::{Additive, StatsCollector, StatsConfig, UnitId, UnitKind};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const INTERVAL_MS: u64 = 200;
const BATCH_ROWS: u64 = 1000;

fn test_config() -> StatsConfig {
    StatsConfig {
        forced_flush_interval_ms: INTERVAL_MS,
        num_workers: 2,
        num_combiners: 1,
    }
}

/// Generate one micro-batch of random values, as the inserting client would
fn random_batch() -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..BATCH_ROWS).map(|_| rng.gen_range(1..=1024)).collect()
}

/// Simulated combiner state: group tables per query, counting newly-created
/// groups as output rows the way the combine path does
#[derive(Default)]
struct CombinerState {
    groups_10: HashSet<u64>,
    group_1_seen: bool,
}

impl CombinerState {
    fn combine_10_groups(&mut self, values: &[u64]) -> u64 {
        let mut new_groups = 0;
        for v in values {
            if self.groups_10.insert(v % 10) {
                new_groups += 1;
            }
        }
        new_groups
    }

    fn combine_1_group(&mut self) -> u64 {
        if self.group_1_seen {
            0
        } else {
            self.group_1_seen = true;
            1
        }
    }
}

/// One insert round: the batch is routed to a single worker, which runs both
/// continuous queries over it; the combiner then merges the partials.
fn process_round(
    collector: &StatsCollector,
    worker: &UnitId,
    combiner: &UnitId,
    state: &mut CombinerState,
    values: &[u64],
) {
    let rows = values.len() as u64;
    let bytes = rows * 8;

    collector.on_stream_insert("stream", rows, 1, bytes);

    // Worker side: partial aggregation for both queries
    let partial_groups = values.iter().map(|v| v % 10).collect::<HashSet<_>>().len() as u64;
    collector
        .on_batch(worker, "test_10_groups", rows, partial_groups, bytes, 3, false)
        .unwrap();
    collector
        .on_batch(worker, "test_1_group", rows, 1, bytes, 1, false)
        .unwrap();

    // Combiner side: merge partials into the group tables
    let new_groups = state.combine_10_groups(values);
    collector
        .on_batch(combiner, "test_10_groups", partial_groups, new_groups, 0, 2, false)
        .unwrap();
    let new_groups = state.combine_1_group();
    collector
        .on_batch(combiner, "test_1_group", 1, new_groups, 0, 1, false)
        .unwrap();
}

#[tokio::test]
async fn test_cq_stats_collection() {
    let collector = Arc::new(StatsCollector::new(test_config()));
    let flusher = collector.spawn_flusher();

    let workers: Vec<UnitId> = (0..collector.config().num_workers)
        .map(|w| UnitId::new(format!("worker{w}")))
        .collect();
    let combiner = UnitId::new("combiner0");

    for worker in &workers {
        collector
            .register_unit(worker.clone(), UnitKind::Worker)
            .unwrap();
    }
    collector
        .register_unit(combiner.clone(), UnitKind::Combiner)
        .unwrap();

    let mut state = CombinerState::default();

    // Two rounds back to back, round-robin across workers
    process_round(&collector, &workers[0], &combiner, &mut state, &random_batch());
    process_round(&collector, &workers[1], &combiner, &mut state, &random_batch());

    // Let the sweeper force the first flush
    tokio::time::sleep(Duration::from_millis(INTERVAL_MS + 100)).await;

    process_round(&collector, &workers[0], &combiner, &mut state, &random_batch());
    process_round(&collector, &workers[1], &combiner, &mut state, &random_batch());

    let views = collector.views();

    // Which of the later batches are visible depends on batch-to-flush
    // grouping, but the first two rounds have flushed and nothing beyond the
    // four rounds can exist.
    for query in ["test_10_groups", "test_1_group"] {
        let rows = views.query_stats(query, UnitKind::Worker).input_rows;
        assert!(
            [2000, 3000, 4000].contains(&rows),
            "{query}: unexpected worker input_rows {rows}"
        );
    }

    // Staleness bound: one interval after the last batch, everything is in
    tokio::time::sleep(Duration::from_millis(INTERVAL_MS + 100)).await;
    flusher.abort();

    // Row cardinality at quiescence
    let proc_rows = views.list_proc_stats();
    assert_eq!(
        proc_rows.len() as u64,
        collector.registry().count(UnitKind::Worker)
            + collector.registry().count(UnitKind::Combiner)
    );
    assert_eq!(views.list_query_stats().len(), 4);

    // All four rounds are now visible, exactly
    for query in ["test_10_groups", "test_1_group"] {
        assert_eq!(
            views.query_stats(query, UnitKind::Worker).input_rows,
            4 * BATCH_ROWS,
            "{query}: worker input_rows after final sweep"
        );
    }

    // Combiner output converges to the group count regardless of how many
    // worker flushes contributed
    assert_eq!(
        views
            .query_stats("test_10_groups", UnitKind::Combiner)
            .output_rows,
        10
    );
    assert_eq!(
        views
            .query_stats("test_1_group", UnitKind::Combiner)
            .output_rows,
        1
    );

    // Ingest-side accounting saw every insert round
    let stream = views.stream_stats("stream");
    assert_eq!(stream.input_rows, 4 * BATCH_ROWS);
    assert_eq!(stream.input_batches, 4);

    // Reads with no intervening merge are idempotent
    assert_eq!(views.list_query_stats(), views.list_query_stats());
    assert_eq!(views.list_proc_stats(), views.list_proc_stats());
}

#[tokio::test]
async fn test_concurrent_flushes_sum_exactly() {
    let collector = Arc::new(StatsCollector::new(StatsConfig {
        forced_flush_interval_ms: 5,
        num_workers: 4,
        num_combiners: 0,
    }));

    let mut handles = Vec::new();
    for w in 0..4 {
        let unit_id = UnitId::new(format!("worker{w}"));
        collector
            .register_unit(unit_id.clone(), UnitKind::Worker)
            .unwrap();
        let collector = Arc::clone(&collector);
        handles.push(tokio::spawn(async move {
            for n in 0..200u64 {
                collector
                    .on_batch(&unit_id, "hot_query", 10, 1, 80, 1, false)
                    .unwrap();
                if n % 50 == 0 {
                    tokio::time::sleep(Duration::from_millis(6)).await;
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Pick up whatever is still pending after the tasks finish
    collector.sweep();

    let views = collector.views();
    let row = views.query_stats("hot_query", UnitKind::Worker);
    assert_eq!(row.input_rows, 4 * 200 * 10);
    assert_eq!(row.output_rows, 4 * 200);

    let proc_total: u64 = views.list_proc_stats().iter().map(|r| r.input_rows).sum();
    assert_eq!(proc_total, row.input_rows);
}

#[tokio::test]
async fn test_sweeper_bounds_staleness_without_traffic() {
    let collector = Arc::new(StatsCollector::new(StatsConfig {
        forced_flush_interval_ms: 50,
        num_workers: 1,
        num_combiners: 0,
    }));
    let flusher = collector.spawn_flusher();

    let worker = UnitId::new("worker0");
    collector
        .register_unit(worker.clone(), UnitKind::Worker)
        .unwrap();

    // A single batch, then silence; only the timer can flush it
    collector
        .on_batch(&worker, "quiet_query", 123, 0, 984, 1, false)
        .unwrap();
    assert!(collector
        .sink()
        .query_counters(&pipeflow_stats::QueryStatsKey::new(
            "quiet_query",
            UnitKind::Worker
        ))
        .is_zero());

    tokio::time::sleep(Duration::from_millis(150)).await;
    flusher.abort();

    assert_eq!(
        collector
            .views()
            .query_stats("quiet_query", UnitKind::Worker)
            .input_rows,
        123
    );
}
