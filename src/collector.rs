//! Stats Collector
//!
//! The facade the execution engine talks to: unit registration, the
//! per-micro-batch callback, the stream-insert callback, and the background
//! flush sweeper that bounds staleness when traffic stops. One accumulator
//! exists per (unit, query) pair; all of them flush into the shared sink.

use crate::accumulator::LocalAccumulator;
use crate::config::StatsConfig;
use crate::counters::StreamCounters;
use crate::error::{Result, StatsError};
use crate::registry::ProcessRegistry;
use crate::sink::StatsSink;
use crate::unit::{UnitId, UnitKind};
use crate::view::StatsViews;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Entry point for all statistics reported by the execution engine
pub struct StatsCollector {
    config: StatsConfig,
    registry: Arc<ProcessRegistry>,
    sink: Arc<StatsSink>,
    accumulators: DashMap<(UnitId, String), Arc<LocalAccumulator>>,
}

impl StatsCollector {
    pub fn new(config: StatsConfig) -> Self {
        Self::with_sink(config, StatsSink::in_memory())
    }

    /// Collector over a caller-provided sink (custom table backends)
    pub fn with_sink(config: StatsConfig, sink: StatsSink) -> Self {
        Self {
            config,
            registry: Arc::new(ProcessRegistry::new()),
            sink: Arc::new(sink),
            accumulators: DashMap::new(),
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &StatsSink {
        &self.sink
    }

    /// Read-side views over the sink and registry
    pub fn views(&self) -> StatsViews {
        StatsViews::new(Arc::clone(&self.sink), Arc::clone(&self.registry))
    }

    /// Register a spawned execution unit
    pub fn register_unit(&self, unit_id: impl Into<UnitId>, kind: UnitKind) -> Result<()> {
        let unit_id = unit_id.into();
        self.registry.register(unit_id.clone(), kind)?;
        info!(unit = %unit_id, kind = %kind, "registered execution unit");
        Ok(())
    }

    /// Retire an execution unit: flush residual deltas for every query it
    /// touched, drop its accumulators, then deregister. No counted work is
    /// silently dropped on retirement.
    pub fn retire_unit(&self, unit_id: &UnitId) -> Result<()> {
        let kind = self.registry.deregister(unit_id)?;

        let stale: Vec<_> = self
            .accumulators
            .iter()
            .filter(|entry| &entry.key().0 == unit_id)
            .map(|entry| entry.key().clone())
            .collect();
        for key in stale {
            if let Some((_, acc)) = self.accumulators.remove(&key) {
                acc.flush(&self.sink);
            }
        }

        info!(unit = %unit_id, kind = %kind, "retired execution unit");
        Ok(())
    }

    /// Per-micro-batch callback from the execution engine. Must be called
    /// from the owning unit's task only. Reporting for an unregistered unit
    /// is a caller contract violation.
    #[allow(clippy::too_many_arguments)]
    pub fn on_batch(
        &self,
        unit_id: &UnitId,
        query_name: &str,
        input_rows: u64,
        output_rows: u64,
        input_bytes: u64,
        elapsed_ms: u64,
        had_error: bool,
    ) -> Result<()> {
        let kind = self
            .registry
            .kind_of(unit_id)
            .ok_or_else(|| StatsError::UnknownUnit(unit_id.to_string()))?;

        let acc = self
            .accumulators
            .entry((unit_id.clone(), query_name.to_string()))
            .or_insert_with(|| {
                Arc::new(LocalAccumulator::new(
                    unit_id.clone(),
                    kind,
                    query_name,
                    self.config.forced_flush_interval(),
                ))
            })
            .clone();

        acc.record_batch(
            input_rows,
            output_rows,
            input_bytes,
            elapsed_ms,
            had_error,
            &self.sink,
        );
        Ok(())
    }

    /// Ingest-side callback from the stream write path
    pub fn on_stream_insert(&self, stream_name: &str, rows: u64, batches: u64, bytes: u64) {
        self.sink
            .merge_stream(stream_name, &StreamCounters::new(rows, batches, bytes));
    }

    /// Flush every pending delta, regardless of interval. Used by the timer
    /// sweep and by shutdown paths.
    pub fn sweep(&self) -> usize {
        let mut flushed = 0;
        for entry in self.accumulators.iter() {
            if entry.value().sweep(&self.sink) {
                flushed += 1;
            }
        }
        flushed
    }

    /// Spawn the background sweeper: ticks at the forced flush interval and
    /// flushes any accumulator with pending counters, so no unit's counters
    /// age more than one interval beyond its last batch. Abort the returned
    /// handle to stop the sweeper.
    pub fn spawn_flusher(self: &Arc<Self>) -> JoinHandle<()> {
        let collector = Arc::clone(self);
        let period = collector.config.forced_flush_interval();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            tick.tick().await;
            loop {
                tick.tick().await;
                let flushed = collector.sweep();
                if flushed > 0 {
                    debug!(accumulators = flushed, "timer sweep flushed pending counters");
                }
            }
        })
    }
}
