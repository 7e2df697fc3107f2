//! Execution Unit Identity
//!
//! Workers ingest raw tuples into a query pipeline; combiners merge partial
//! results into persisted state. Both report statistics under a stable unit id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role of an execution unit in the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Ingests raw input rows and produces partial results
    Worker,
    /// Merges partial results from workers into final aggregated output
    Combiner,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Worker => "worker",
            UnitKind::Combiner => "combiner",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier for one execution unit (one worker or combiner instance)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        UnitId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        UnitId(id.to_string())
    }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self {
        UnitId(id)
    }
}
