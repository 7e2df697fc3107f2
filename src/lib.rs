//! Statistics collection for the pipeflow continuous-query engine.
//!
//! Workers and combiners report per-micro-batch execution counters through
//! [`StatsCollector::on_batch`]; counters accumulate locally per unit and are
//! flushed into the shared [`StatsSink`] on a bounded interval, where they
//! merge additively into the process-, query-, and stream-level views.

pub mod accumulator;
pub mod collector;
pub mod config;
pub mod counters;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod unit;
pub mod view;

pub use accumulator::LocalAccumulator;
pub use collector::StatsCollector;
pub use config::StatsConfig;
pub use counters::{Additive, CounterSet, LocalCounters, StreamCounters};
pub use error::{Result, StatsError};
pub use registry::ProcessRegistry;
pub use scheduler::FlushScheduler;
pub use sink::{QueryStatsKey, StatsSink};
pub use store::{MemoryTable, StatsTable};
pub use unit::{UnitId, UnitKind};
pub use view::{ProcStatsRow, QueryStatsRow, StatsViews, StreamStatsRow};
