// ABOUTME: Data model for the wearable ingestion pipeline
// ABOUTME: Devices, measurement keys, health data points and per-day aggregate rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared data model.
//!
//! Points flow through the pipeline as `Arc<HealthDataPoint>`: the buffer that
//! holds a point and every subscriber that received it share one immutable copy.

/// Per-day aggregate rows and summaries
pub mod daily;
/// Health data points and raw device events
pub mod data_point;
/// Devices, advertisements and GATT tables
pub mod device;
/// Validated measurement type keys
pub mod measurement;

pub use daily::{DailyActivity, DailySleep, DailySummary, MeasurementSummary};
pub use data_point::{parse_timestamp, HealthDataPoint, Metadata, RawEvent, UserId};
pub use device::{
    ConnectionState, Device, DeviceAdvertisement, DeviceInfo, DeviceType, DiscoveredDevice,
    GattCharacteristic, GattService,
};
pub use measurement::MeasurementType;
