//! Configuration
//!
//! Sizing and staleness knobs for the stats subsystem. Values come from the
//! engine's startup configuration; `from_env` supports the usual
//! environment-variable overrides for development.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum time a unit's counters may remain unflushed
pub const DEFAULT_FORCED_FLUSH_INTERVAL_MS: u64 = 1000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Maximum staleness bound per unit, in milliseconds
    pub forced_flush_interval_ms: u64,

    /// Worker processes the engine runs at startup
    pub num_workers: usize,

    /// Combiner processes the engine runs at startup
    pub num_combiners: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            forced_flush_interval_ms: DEFAULT_FORCED_FLUSH_INTERVAL_MS,
            num_workers: 1,
            num_combiners: 1,
        }
    }
}

impl StatsConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Recognized variables: `PIPEFLOW_FORCED_FLUSH_INTERVAL_MS`,
    /// `PIPEFLOW_NUM_WORKERS`, `PIPEFLOW_NUM_COMBINERS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            forced_flush_interval_ms: env_u64(
                "PIPEFLOW_FORCED_FLUSH_INTERVAL_MS",
                defaults.forced_flush_interval_ms,
            ),
            num_workers: env_u64("PIPEFLOW_NUM_WORKERS", defaults.num_workers as u64) as usize,
            num_combiners: env_u64("PIPEFLOW_NUM_COMBINERS", defaults.num_combiners as u64)
                as usize,
        }
    }

    /// The forced flush interval as a `Duration`
    pub fn forced_flush_interval(&self) -> Duration {
        Duration::from_millis(self.forced_flush_interval_ms)
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
