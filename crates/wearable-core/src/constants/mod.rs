// ABOUTME: Constants module with domain-separated organization
// ABOUTME: GATT identifiers, measurement names, pipeline defaults and environment keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constants module
//!
//! Constants are grouped by domain rather than collected in one large file.

/// Bluetooth GATT service and characteristic UUIDs
pub mod ble;
/// Measurement type names and their routing groups
pub mod measurements;
/// Pipeline defaults (capacities, periods, timeouts)
pub mod pipeline;

/// Environment variable names read by the configuration layer
pub mod env_config {
    /// Database connection URL
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Per measurement-type buffer capacity
    pub const BUFFER_CAPACITY: &str = "WEARABLE_BUFFER_CAPACITY";
    /// Maximum number of distinct measurement-type buffers
    pub const MAX_MEASUREMENT_TYPES: &str = "WEARABLE_MAX_MEASUREMENT_TYPES";
    /// Event bus broadcast channel capacity
    pub const EVENT_CHANNEL_CAPACITY: &str = "WEARABLE_EVENT_CHANNEL_CAPACITY";
    /// Processor period in seconds
    pub const PROCESS_INTERVAL_SECS: &str = "WEARABLE_PROCESS_INTERVAL_SECS";
    /// Processor backoff after a failed cycle in seconds
    pub const PROCESS_ERROR_BACKOFF_SECS: &str = "WEARABLE_PROCESS_ERROR_BACKOFF_SECS";
    /// Discovery window of the continuous scan in seconds
    pub const SCAN_DURATION_SECS: &str = "WEARABLE_SCAN_DURATION_SECS";
    /// Rest between continuous scans in seconds
    pub const SCAN_INTERVAL_SECS: &str = "WEARABLE_SCAN_INTERVAL_SECS";
    /// Rest after a failed scan in seconds
    pub const SCAN_ERROR_BACKOFF_SECS: &str = "WEARABLE_SCAN_ERROR_BACKOFF_SECS";
    /// Bounded join timeout when stopping background loops
    pub const STOP_TIMEOUT_SECS: &str = "WEARABLE_STOP_TIMEOUT_SECS";
    /// Timeout applied to every transport call
    pub const TRANSPORT_TIMEOUT_SECS: &str = "WEARABLE_TRANSPORT_TIMEOUT_SECS";
    /// Timeout applied to every storage call
    pub const STORAGE_TIMEOUT_SECS: &str = "WEARABLE_STORAGE_TIMEOUT_SECS";
}

/// Service identification for structured logging
pub mod service_names {
    /// Main service name
    pub const WEARABLE_INGEST: &str = "wearable-ingest";
}
