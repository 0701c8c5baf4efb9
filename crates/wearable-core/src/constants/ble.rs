// ABOUTME: Bluetooth GATT service and characteristic UUIDs for health devices
// ABOUTME: Standard 128-bit forms of the Bluetooth SIG assigned numbers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Heart Rate service
pub const HEART_RATE_SERVICE: &str = "0000180d-0000-1000-8000-00805f9b34fb";

/// Heart Rate Measurement characteristic (notify)
pub const HEART_RATE_MEASUREMENT: &str = "00002a37-0000-1000-8000-00805f9b34fb";
/// Body Sensor Location characteristic
pub const BODY_SENSOR_LOCATION: &str = "00002a38-0000-1000-8000-00805f9b34fb";
/// GAP Device Name characteristic
pub const DEVICE_NAME: &str = "00002a00-0000-1000-8000-00805f9b34fb";
/// Device Information Manufacturer Name characteristic
pub const MANUFACTURER_NAME: &str = "00002a29-0000-1000-8000-00805f9b34fb";

/// Heart Rate Measurement flag: value is a little-endian u16
pub const HR_FLAG_VALUE_U16: u8 = 0x01;

/// Name keywords that mark an advertisement as a health device
pub const HEALTH_NAME_KEYWORDS: &[&str] = &[
    "heart",
    "polar",
    "garmin",
    "fitbit",
    "apple watch",
    "samsung",
    "withings",
    "omron",
    "scale",
    "blood pressure",
    "glucose",
    "pulse",
    "fitness",
    "tracker",
    "band",
];
