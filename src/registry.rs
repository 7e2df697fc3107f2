//! Process Registry
//!
//! Tracks the set of live execution units so the process-stats view knows its
//! cardinality: at any quiescent point the number of ProcStats rows equals
//! `count(worker) + count(combiner)`.

use crate::error::{Result, StatsError};
use crate::unit::{UnitId, UnitKind};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Live execution units, keyed by unit id
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    units: DashMap<UnitId, UnitKind>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spawned unit. Registering an id twice is a caller contract
    /// violation and returns an error.
    pub fn register(&self, unit_id: UnitId, kind: UnitKind) -> Result<()> {
        match self.units.entry(unit_id) {
            Entry::Occupied(entry) => {
                Err(StatsError::UnitAlreadyRegistered(entry.key().to_string()))
            }
            Entry::Vacant(entry) => {
                entry.insert(kind);
                Ok(())
            }
        }
    }

    /// Remove a retired unit, returning its kind. Deregistering an unknown id
    /// is a caller contract violation.
    pub fn deregister(&self, unit_id: &UnitId) -> Result<UnitKind> {
        self.units
            .remove(unit_id)
            .map(|(_, kind)| kind)
            .ok_or_else(|| StatsError::UnknownUnit(unit_id.to_string()))
    }

    /// The kind of a live unit, if registered
    pub fn kind_of(&self, unit_id: &UnitId) -> Option<UnitKind> {
        self.units.get(unit_id).map(|entry| *entry.value())
    }

    /// Number of live units of one kind
    pub fn count(&self, kind: UnitKind) -> u64 {
        self.units.iter().filter(|e| *e.value() == kind).count() as u64
    }

    /// Total number of live units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Snapshot of live units, sorted by id for stable iteration
    pub fn snapshot(&self) -> Vec<(UnitId, UnitKind)> {
        let mut units: Vec<_> = self
            .units
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        units.sort_by(|a, b| a.0.cmp(&b.0));
        units
    }
}
