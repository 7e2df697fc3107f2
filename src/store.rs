//! Stats Tables
//!
//! The durable-table boundary behind the sink: upsert-by-key with additive
//! merge, plus a full scan for the read views. The persistence engine is
//! external to this subsystem; `MemoryTable` is the in-process implementation
//! used by the engine and by every test.

use crate::counters::Additive;
use dashmap::DashMap;
use std::hash::Hash;

/// A keyed table of additively-merged rows.
///
/// `upsert` creates a zero-valued row on first touch, so there is no
/// "not found" failure on the write path; absence simply means zero.
pub trait StatsTable<K, V>: Send + Sync
where
    V: Additive,
{
    /// Merge `delta` into the row at `key`, creating the row if absent.
    /// Merges into the same key are serialized by the implementation.
    fn upsert(&self, key: &K, delta: &V);

    /// The current row value, if the key has been touched
    fn get(&self, key: &K) -> Option<V>;

    /// All rows, in no particular order
    fn scan(&self) -> Vec<(K, V)>;

    /// Number of rows
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory stats table over a sharded concurrent map
#[derive(Debug)]
pub struct MemoryTable<K, V>
where
    K: Eq + Hash,
{
    rows: DashMap<K, V>,
}

impl<K, V> MemoryTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }
}

impl<K, V> Default for MemoryTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StatsTable<K, V> for MemoryTable<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Additive + Send + Sync,
{
    fn upsert(&self, key: &K, delta: &V) {
        // The entry guard serializes concurrent merges into the same key
        let mut row = self.rows.entry(key.clone()).or_default();
        row.merge(delta);
    }

    fn get(&self, key: &K) -> Option<V> {
        self.rows.get(key).map(|row| row.value().clone())
    }

    fn scan(&self) -> Vec<(K, V)> {
        self.rows
            .iter()
            .map(|row| (row.key().clone(), row.value().clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}
