// ABOUTME: Per-day aggregate rows (activity, sleep) and derived daily summaries
// ABOUTME: Implements the nonzero-wins merge used for partial same-day updates
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::data_point::UserId;
use super::measurement::MeasurementType;
use crate::constants::measurements::{
    CALORIES, DISTANCE, FAIRLY_ACTIVE, LIGHTLY_ACTIVE, SEDENTARY, SLEEP_DURATION,
    SLEEP_EFFICIENCY, STEPS, TIME_IN_BED, VERY_ACTIVE,
};

/// Nonzero-wins for integer fields
const fn pick(existing: i64, incoming: i64) -> i64 {
    if incoming == 0 {
        existing
    } else {
        incoming
    }
}

/// Nonzero-wins for float fields
#[allow(clippy::float_cmp)]
fn pick_f64(existing: f64, incoming: f64) -> f64 {
    if incoming == 0.0 {
        existing
    } else {
        incoming
    }
}

/// Activity totals for one user and day
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Step count
    pub steps: i64,
    /// Distance travelled
    pub distance: f64,
    /// Very active minutes
    pub very_active_minutes: i64,
    /// Fairly active minutes
    pub fairly_active_minutes: i64,
    /// Lightly active minutes
    pub lightly_active_minutes: i64,
    /// Sedentary minutes
    pub sedentary_minutes: i64,
    /// Calories burned
    pub calories: i64,
}

impl DailyActivity {
    /// Partial row carrying a single activity measurement, `None` for other types
    #[must_use]
    pub fn from_measurement(measurement_type: &MeasurementType, value: f64) -> Option<Self> {
        let whole = value as i64;
        let mut row = Self::default();
        match measurement_type.as_str() {
            STEPS => row.steps = whole,
            DISTANCE => row.distance = value,
            CALORIES => row.calories = whole,
            VERY_ACTIVE => row.very_active_minutes = whole,
            FAIRLY_ACTIVE => row.fairly_active_minutes = whole,
            LIGHTLY_ACTIVE => row.lightly_active_minutes = whole,
            SEDENTARY => row.sedentary_minutes = whole,
            _ => return None,
        }
        Some(row)
    }

    /// Merge a partial update into this row
    ///
    /// A zero in `incoming` never overwrites a stored value; any nonzero
    /// incoming value replaces it.
    #[must_use]
    pub fn merge_nonzero(&self, incoming: &Self) -> Self {
        Self {
            steps: pick(self.steps, incoming.steps),
            distance: pick_f64(self.distance, incoming.distance),
            very_active_minutes: pick(self.very_active_minutes, incoming.very_active_minutes),
            fairly_active_minutes: pick(self.fairly_active_minutes, incoming.fairly_active_minutes),
            lightly_active_minutes: pick(
                self.lightly_active_minutes,
                incoming.lightly_active_minutes,
            ),
            sedentary_minutes: pick(self.sedentary_minutes, incoming.sedentary_minutes),
            calories: pick(self.calories, incoming.calories),
        }
    }
}

/// Sleep totals for one user and night
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySleep {
    /// Number of sleep records folded into the row
    pub records: i64,
    /// Minutes asleep
    pub minutes_asleep: i64,
    /// Minutes in bed
    pub time_in_bed: i64,
    /// Sleep efficiency percentage
    pub efficiency: f64,
}

impl Default for DailySleep {
    fn default() -> Self {
        Self {
            records: 1,
            minutes_asleep: 0,
            time_in_bed: 0,
            efficiency: 0.0,
        }
    }
}

impl DailySleep {
    /// Partial row carrying a single sleep measurement, `None` for other types
    #[must_use]
    pub fn from_measurement(measurement_type: &MeasurementType, value: f64) -> Option<Self> {
        let mut row = Self::default();
        match measurement_type.as_str() {
            SLEEP_DURATION => row.minutes_asleep = value as i64,
            TIME_IN_BED => row.time_in_bed = value as i64,
            SLEEP_EFFICIENCY => row.efficiency = value,
            _ => return None,
        }
        Some(row)
    }

    /// Merge a partial update with the same nonzero-wins rule as activity rows
    #[must_use]
    pub fn merge_nonzero(&self, incoming: &Self) -> Self {
        Self {
            records: pick(self.records, incoming.records),
            minutes_asleep: pick(self.minutes_asleep, incoming.minutes_asleep),
            time_in_bed: pick(self.time_in_bed, incoming.time_in_bed),
            efficiency: pick_f64(self.efficiency, incoming.efficiency),
        }
    }
}

/// Statistics for one measurement type within a day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSummary {
    /// Mean value
    pub avg: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Number of values
    pub count: usize,
}

impl MeasurementSummary {
    /// Summarize a set of values, `None` when empty
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );
        Some(Self {
            avg: sum / values.len() as f64,
            min,
            max,
            count: values.len(),
        })
    }
}

/// Per-user, per-day rollup of buffered readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Owning user
    pub user_id: UserId,
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Total readings across all types
    pub data_points: usize,
    /// Types that had at least one reading
    pub measurements: BTreeSet<String>,
    /// Statistics per type
    pub metrics: BTreeMap<String, MeasurementSummary>,
}

impl DailySummary {
    /// Empty summary for a user and day
    #[must_use]
    pub const fn empty(user_id: UserId, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            data_points: 0,
            measurements: BTreeSet::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Whether no readings contributed
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data_points == 0
    }
}
