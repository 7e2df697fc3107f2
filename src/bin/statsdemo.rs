//! Load generator for the stats subsystem.
//!
//! Spawns simulated workers and combiners that report random micro-batches
//! against two queries, lets the flush sweeper run, then prints the three
//! views as JSON. Development harness only; the real engine drives the
//! collector through the same callbacks.

use anyhow::Result;
use clap::Parser;
use pipeflow_stats::{StatsCollector, StatsConfig, UnitId, UnitKind};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "statsdemo")]
#[command(about = "Load generator for pipeflow stats collection")]
struct Args {
    /// Number of simulated worker units
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// Number of simulated combiner units
    #[arg(long, default_value_t = 1)]
    combiners: usize,

    /// Micro-batches per unit
    #[arg(long, default_value_t = 8)]
    batches: usize,

    /// Rows per micro-batch
    #[arg(long, default_value_t = 1000)]
    batch_rows: u64,

    /// Forced flush interval in milliseconds
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,
}

async fn run_worker(
    collector: Arc<StatsCollector>,
    unit_id: UnitId,
    batches: usize,
    batch_rows: u64,
) {
    for n in 0..batches {
        let query = if n % 2 == 0 { "test_10_groups" } else { "test_1_group" };
        let (bytes, elapsed_ms, pause_ms) = {
            let mut rng = rand::thread_rng();
            (
                batch_rows * rng.gen_range(8..64),
                rng.gen_range(1..20),
                rng.gen_range(10..80),
            )
        };
        collector.on_stream_insert("stream", batch_rows, 1, bytes);
        collector
            .on_batch(&unit_id, query, batch_rows, batch_rows, bytes, elapsed_ms, false)
            .expect("worker is registered");
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;
    }
}

async fn run_combiner(
    collector: Arc<StatsCollector>,
    unit_id: UnitId,
    batches: usize,
    batch_rows: u64,
) {
    let mut groups_seen: HashSet<u64> = HashSet::new();
    for n in 0..batches {
        let query = if n % 2 == 0 { "test_10_groups" } else { "test_1_group" };
        let num_groups: u64 = if n % 2 == 0 { 10 } else { 1 };

        // Output rows count newly-created groups, as the combine path does
        let mut new_groups = 0;
        for g in 0..num_groups {
            if groups_seen.insert((n as u64 % 2) * 100 + g) {
                new_groups += 1;
            }
        }

        let elapsed_ms = rand::thread_rng().gen_range(1..10);
        collector
            .on_batch(&unit_id, query, batch_rows, new_groups, 0, elapsed_ms, false)
            .expect("combiner is registered");
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = StatsConfig {
        forced_flush_interval_ms: args.interval_ms,
        num_workers: args.workers,
        num_combiners: args.combiners,
    };
    info!(
        workers = config.num_workers,
        combiners = config.num_combiners,
        interval_ms = config.forced_flush_interval_ms,
        "starting load generation"
    );

    let collector = Arc::new(StatsCollector::new(config));
    let flusher = collector.spawn_flusher();

    let mut tasks = Vec::new();
    for w in 0..args.workers {
        let unit_id = UnitId::new(format!("worker{w}"));
        collector.register_unit(unit_id.clone(), UnitKind::Worker)?;
        tasks.push(tokio::spawn(run_worker(
            Arc::clone(&collector),
            unit_id,
            args.batches,
            args.batch_rows,
        )));
    }
    for c in 0..args.combiners {
        let unit_id = UnitId::new(format!("combiner{c}"));
        collector.register_unit(unit_id.clone(), UnitKind::Combiner)?;
        tasks.push(tokio::spawn(run_combiner(
            Arc::clone(&collector),
            unit_id,
            args.batches,
            args.batch_rows,
        )));
    }

    for task in tasks {
        task.await?;
    }

    // Give the sweeper one interval to pick up residual deltas
    tokio::time::sleep(Duration::from_millis(args.interval_ms * 2)).await;
    flusher.abort();

    let views = collector.views();
    println!(
        "proc_stats: {}",
        serde_json::to_string_pretty(&views.list_proc_stats())?
    );
    println!(
        "query_stats: {}",
        serde_json::to_string_pretty(&views.list_query_stats())?
    );
    println!(
        "stream_stats: {}",
        serde_json::to_string_pretty(&views.list_stream_stats())?
    );

    Ok(())
}
