// ABOUTME: Configuration module for the ingestion pipeline
// ABOUTME: Service-wide settings from the environment and per-component sub-configs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration
//!
//! [`IngestConfig`] is loaded once from the environment. Each component takes
//! its own small config struct, derived from it or built with `Default` in
//! tests.

use std::time::Duration;

use wearable_core::constants::pipeline;

/// Environment and service configuration
pub mod environment;

pub use environment::{DatabaseUrl, IngestConfig};

/// Data collector settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Per measurement-type buffer capacity
    pub buffer_capacity: usize,
    /// Cap on distinct measurement-type buffers
    pub max_measurement_types: usize,
    /// Event bus capacity
    pub event_channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: pipeline::DEFAULT_BUFFER_CAPACITY,
            max_measurement_types: pipeline::DEFAULT_MAX_MEASUREMENT_TYPES,
            event_channel_capacity: pipeline::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Device scanner settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Discovery window of one continuous scan pass
    pub scan_duration: Duration,
    /// Rest between scan passes
    pub scan_interval: Duration,
    /// Rest after a failed scan pass
    pub error_backoff: Duration,
    /// Bounded join timeout for the scan loop
    pub stop_timeout: Duration,
    /// Per-call transport timeout
    pub transport_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_duration: Duration::from_secs(pipeline::DEFAULT_SCAN_DURATION_SECS),
            scan_interval: Duration::from_secs(pipeline::DEFAULT_SCAN_INTERVAL_SECS),
            error_backoff: Duration::from_secs(pipeline::DEFAULT_SCAN_ERROR_BACKOFF_SECS),
            stop_timeout: Duration::from_secs(pipeline::DEFAULT_STOP_TIMEOUT_SECS),
            transport_timeout: Duration::from_secs(pipeline::DEFAULT_TRANSPORT_TIMEOUT_SECS),
        }
    }
}

/// Background processor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Period between cycles
    pub interval: Duration,
    /// Rest after a failed cycle
    pub error_backoff: Duration,
    /// Bounded join timeout for the processing loop
    pub stop_timeout: Duration,
    /// Per-call storage timeout
    pub storage_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(pipeline::DEFAULT_PROCESS_INTERVAL_SECS),
            error_backoff: Duration::from_secs(pipeline::DEFAULT_PROCESS_ERROR_BACKOFF_SECS),
            stop_timeout: Duration::from_secs(pipeline::DEFAULT_STOP_TIMEOUT_SECS),
            storage_timeout: Duration::from_secs(pipeline::DEFAULT_STORAGE_TIMEOUT_SECS),
        }
    }
}
