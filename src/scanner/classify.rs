// ABOUTME: Name-based heuristics that decide whether an advertisement is a health device
// ABOUTME: and which device type it most likely is (first matching keyword group wins)
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use wearable_core::constants::ble::HEALTH_NAME_KEYWORDS;
use wearable_core::models::DeviceType;

/// Ordered keyword groups; the first group with a hit decides the type
const TYPE_KEYWORDS: &[(DeviceType, &[&str])] = &[
    (DeviceType::HeartRateMonitor, &["heart", "hr", "pulse", "polar"]),
    (DeviceType::WeightScale, &["scale", "weight"]),
    (DeviceType::BloodPressureMonitor, &["blood", "pressure", "bp"]),
    (DeviceType::GlucoseMeter, &["glucose", "sugar", "diabetes"]),
    (
        DeviceType::FitnessTracker,
        &["fitbit", "garmin", "tracker", "band", "watch"],
    ),
];

/// Whether an advertised name looks like a health device
#[must_use]
pub fn is_health_device(name: &str) -> bool {
    let lowered = name.to_lowercase();
    !lowered.trim().is_empty() && HEALTH_NAME_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Classify an advertised name
///
/// Matching is case-insensitive substring search, so short keywords such as
/// `hr` or `bp` also hit inside longer words.
#[must_use]
pub fn classify_device(name: Option<&str>) -> DeviceType {
    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
        return DeviceType::Unknown;
    };
    let lowered = name.to_lowercase();

    TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map_or(DeviceType::HealthDevice, |(device_type, _)| *device_type)
}
