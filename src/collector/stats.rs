// ABOUTME: Monotonic collection counters keyed by outcome or measurement type
// ABOUTME: Lock-free increments through DashMap; snapshots are plain serializable structs

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::Serialize;
use wearable_core::models::MeasurementType;

/// Counter identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatKey {
    /// Accepted points (device and manual)
    TotalCollected,
    /// Points declined by the validator
    Rejected,
    /// Malformed points (bad timestamp, bad key, type cap reached)
    Errors,
    /// Accepted manual entries
    ManualEntries,
    /// Accepted points of one measurement type
    Measurement(MeasurementType),
}

/// Process-lifetime counters; never reset
#[derive(Default)]
pub struct CollectionStats {
    counters: DashMap<StatKey, u64>,
}

impl CollectionStats {
    /// Zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to a counter
    pub fn increment(&self, key: StatKey) {
        *self.counters.entry(key).or_insert(0) += 1;
    }

    /// Current value of a counter
    #[must_use]
    pub fn get(&self, key: &StatKey) -> u64 {
        self.counters.get(key).map_or(0, |v| *v)
    }

    /// Point-in-time copy of every counter
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut snapshot = StatsSnapshot::default();
        for entry in &self.counters {
            let value = *entry.value();
            match entry.key() {
                StatKey::TotalCollected => snapshot.total_collected = value,
                StatKey::Rejected => snapshot.rejected = value,
                StatKey::Errors => snapshot.errors = value,
                StatKey::ManualEntries => snapshot.manual_entries = value,
                StatKey::Measurement(t) => {
                    snapshot.per_type.insert(t.to_string(), value);
                }
            }
        }
        snapshot
    }
}

/// Copy of [`CollectionStats`] at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Accepted points
    pub total_collected: u64,
    /// Validator rejections
    pub rejected: u64,
    /// Malformed points
    pub errors: u64,
    /// Accepted manual entries
    pub manual_entries: u64,
    /// Accepted points per measurement type
    pub per_type: BTreeMap<String, u64>,
}

impl StatsSnapshot {
    /// Accepted points of one type
    #[must_use]
    pub fn for_type(&self, measurement_type: &str) -> u64 {
        self.per_type.get(measurement_type).copied().unwrap_or(0)
    }
}
