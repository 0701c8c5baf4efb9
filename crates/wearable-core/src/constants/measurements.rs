// ABOUTME: Measurement type names and the storage routing groups they belong to
// ABOUTME: Shared by the collector, validator and background processor
//
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Sentinel device address used for manually entered data
pub const MANUAL_DEVICE_ADDRESS: &str = "manual";

/// Measurement type assigned when a raw event omits it
pub const UNKNOWN: &str = "unknown";

/// Heart rate in beats per minute
pub const HEART_RATE: &str = "heart_rate";

/// Step count
pub const STEPS: &str = "steps";
/// Distance travelled
pub const DISTANCE: &str = "distance";
/// Calories burned
pub const CALORIES: &str = "calories";
/// Very active minutes
pub const VERY_ACTIVE: &str = "very_active";
/// Fairly active minutes
pub const FAIRLY_ACTIVE: &str = "fairly_active";
/// Lightly active minutes
pub const LIGHTLY_ACTIVE: &str = "lightly_active";
/// Sedentary minutes
pub const SEDENTARY: &str = "sedentary";

/// Minutes asleep
pub const SLEEP_DURATION: &str = "sleep_duration";
/// Minutes in bed
pub const TIME_IN_BED: &str = "time_in_bed";
/// Sleep efficiency percentage
pub const SLEEP_EFFICIENCY: &str = "sleep_efficiency";

/// Body weight in kilograms
pub const WEIGHT: &str = "weight";

/// Longest accepted measurement type key
pub const MAX_MEASUREMENT_TYPE_LEN: usize = 64;
