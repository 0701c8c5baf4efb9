// ABOUTME: Shared test utilities for ingestion integration tests
// ABOUTME: Quiet logging setup plus collector, scanner and processor builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `wearable_ingest`

use std::sync::{Arc, Once};
use std::time::Duration;

use wearable_ingest::collector::{DataCollector, RangeValidator};
use wearable_ingest::config::{CollectorConfig, ProcessorConfig, ScannerConfig};
use wearable_ingest::models::{DeviceType, RawEvent, UserId};
use wearable_ingest::processor::BackgroundProcessor;
use wearable_ingest::scanner::DeviceScanner;
use wearable_ingest::storage::InMemoryStorage;
use wearable_ingest::transport::SimulatedTransport;

static INIT_LOGGER: Once = Once::new();

pub const STRAP: &str = "AA:BB:CC:DD:EE:01";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Collector with default capacities and no validator
pub fn collector() -> Arc<DataCollector> {
    init_test_logging();
    Arc::new(DataCollector::new(CollectorConfig::default()))
}

/// Collector with the default range validator
pub fn validating_collector() -> Arc<DataCollector> {
    init_test_logging();
    Arc::new(
        DataCollector::new(CollectorConfig::default())
            .with_validator(Arc::new(RangeValidator::default())),
    )
}

/// Collector with `STRAP` registered to `user_id`
pub async fn collector_with_strap(user_id: UserId) -> Arc<DataCollector> {
    let collector = collector();
    collector
        .register_device(STRAP, user_id, DeviceType::HeartRateMonitor)
        .await;
    collector
}

/// Raw event from `address` with a value and RFC 3339 timestamp
pub fn event(address: &str, measurement_type: &str, value: f64, timestamp: &str) -> RawEvent {
    RawEvent {
        device_address: Some(address.to_owned()),
        measurement_type: Some(measurement_type.to_owned()),
        value: Some(value),
        timestamp: Some(timestamp.to_owned()),
        ..RawEvent::default()
    }
}

/// Scanner settings with short timings for tests
pub fn fast_scanner_config() -> ScannerConfig {
    ScannerConfig {
        scan_duration: Duration::from_secs(10),
        scan_interval: Duration::from_secs(30),
        error_backoff: Duration::from_secs(60),
        stop_timeout: Duration::from_secs(5),
        transport_timeout: Duration::from_secs(2),
    }
}

/// Scanner over a shared simulated transport
pub fn scanner(transport: &SimulatedTransport) -> Arc<DeviceScanner> {
    init_test_logging();
    Arc::new(DeviceScanner::new(
        Arc::new(transport.clone()),
        fast_scanner_config(),
    ))
}

/// Processor over in-memory storage
pub fn processor(
    collector: &Arc<DataCollector>,
    storage: &Arc<InMemoryStorage>,
) -> Arc<BackgroundProcessor> {
    let config = ProcessorConfig {
        storage_timeout: Duration::from_secs(1),
        ..ProcessorConfig::default()
    };
    Arc::new(BackgroundProcessor::new(
        collector.clone(),
        storage.clone(),
        config,
    ))
}
