// ABOUTME: Pluggable validation of points before they are buffered
// ABOUTME: Ships a range validator with physiological bounds for the known measurement types
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use wearable_core::constants::measurements::{
    CALORIES, DISTANCE, FAIRLY_ACTIVE, HEART_RATE, LIGHTLY_ACTIVE, SEDENTARY, SLEEP_DURATION,
    SLEEP_EFFICIENCY, STEPS, TIME_IN_BED, VERY_ACTIVE, WEIGHT,
};
use wearable_core::models::HealthDataPoint;

/// Verdict on one point
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Keep the point, optionally replacing its confidence
    Accept {
        /// New confidence; clamped to [0, 1] by the collector
        confidence: Option<f64>,
    },
    /// Drop the point
    Reject {
        /// Human readable reason
        reason: String,
    },
}

impl ValidationOutcome {
    /// Accept with the point's own confidence
    #[must_use]
    pub const fn accept() -> Self {
        Self::Accept { confidence: None }
    }

    /// Accept with an adjusted confidence
    #[must_use]
    pub const fn accept_with_confidence(confidence: f64) -> Self {
        Self::Accept {
            confidence: Some(confidence),
        }
    }

    /// Reject with a reason
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }
}

/// Decides whether a point may enter the buffers
pub trait DataValidator: Send + Sync {
    /// Inspect one point
    fn validate(&self, point: &HealthDataPoint) -> ValidationOutcome;
}

impl<F> DataValidator for F
where
    F: Fn(&HealthDataPoint) -> ValidationOutcome + Send + Sync,
{
    fn validate(&self, point: &HealthDataPoint) -> ValidationOutcome {
        self(point)
    }
}

/// Inclusive bounds checker
///
/// Non-finite values are always rejected. Types without a configured range
/// are accepted as-is.
#[derive(Debug, Clone)]
pub struct RangeValidator {
    ranges: HashMap<String, (f64, f64)>,
}

impl Default for RangeValidator {
    fn default() -> Self {
        let minutes_in_day = 1_440.0;
        let ranges = [
            (HEART_RATE, (1.0, 300.0)),
            (STEPS, (0.0, f64::INFINITY)),
            (DISTANCE, (0.0, f64::INFINITY)),
            (CALORIES, (0.0, f64::INFINITY)),
            (VERY_ACTIVE, (0.0, f64::INFINITY)),
            (FAIRLY_ACTIVE, (0.0, f64::INFINITY)),
            (LIGHTLY_ACTIVE, (0.0, f64::INFINITY)),
            (SEDENTARY, (0.0, f64::INFINITY)),
            (SLEEP_DURATION, (0.0, minutes_in_day)),
            (TIME_IN_BED, (0.0, minutes_in_day)),
            (SLEEP_EFFICIENCY, (0.0, 100.0)),
            (WEIGHT, (0.0, 500.0)),
        ]
        .into_iter()
        .map(|(name, range)| (name.to_owned(), range))
        .collect();
        Self { ranges }
    }
}

impl RangeValidator {
    /// Validator with no ranges (only non-finite values are refused)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ranges: HashMap::new(),
        }
    }

    /// Add or replace the inclusive range for a type
    #[must_use]
    pub fn with_range(mut self, measurement_type: &str, min: f64, max: f64) -> Self {
        self.ranges
            .insert(measurement_type.to_ascii_lowercase(), (min, max));
        self
    }

    /// Configured range for a type
    #[must_use]
    pub fn range(&self, measurement_type: &str) -> Option<(f64, f64)> {
        self.ranges.get(measurement_type).copied()
    }
}

impl DataValidator for RangeValidator {
    fn validate(&self, point: &HealthDataPoint) -> ValidationOutcome {
        if !point.value.is_finite() {
            return ValidationOutcome::reject(format!("value {} is not finite", point.value));
        }
        match self.range(point.measurement_type.as_str()) {
            Some((min, max)) if point.value < min || point.value > max => {
                ValidationOutcome::reject(format!(
                    "value {} outside [{min}, {max}]",
                    point.value
                ))
            }
            _ => ValidationOutcome::accept(),
        }
    }
}
