// ABOUTME: Integration tests for the data collector ingestion path
// ABOUTME: Covers device registry drops, manual entries, validation, counters and buffer limits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![allow(missing_docs, clippy::unwrap_used, clippy::float_cmp)]

mod common;

use std::sync::Arc;

use common::{collector, collector_with_strap, event, validating_collector, STRAP};
use wearable_ingest::collector::{DataCollector, ValidationOutcome};
use wearable_ingest::config::CollectorConfig;
use wearable_ingest::errors::IngestError;
use wearable_ingest::models::{DeviceType, HealthDataPoint, RawEvent};

#[tokio::test]
async fn test_unregistered_device_leaves_state_untouched() {
    let collector = collector();

    let result = collector
        .collect(event("11:22:33", "heart_rate", 70.0, "2026-05-01T08:00:00Z"))
        .await;

    assert!(matches!(result, Err(IngestError::UnknownDevice { .. })));
    assert!(collector.get_recent("heart_rate", 10).await.is_empty());
    assert_eq!(collector.stats(), Default::default());
}

#[tokio::test]
async fn test_missing_address_is_unknown_device() {
    let collector = collector_with_strap(1).await;
    let result = collector.collect(RawEvent::default()).await;
    assert_eq!(result.unwrap_err(), IngestError::UnknownDevice { address: None });
    assert_eq!(collector.stats().total_collected, 0);
}

#[tokio::test]
async fn test_collect_builds_point_from_event() {
    let collector = collector_with_strap(42).await;

    let point = collector
        .collect(RawEvent {
            raw_data: Some("0048".to_owned()),
            ..event(STRAP, "Heart_Rate", 72.0, "2026-05-01T08:00:00")
        })
        .await
        .unwrap();

    assert_eq!(point.user_id, 42);
    assert_eq!(point.measurement_type.as_str(), "heart_rate");
    assert_eq!(point.device_type, DeviceType::HeartRateMonitor);
    assert_eq!(point.value, 72.0);
    assert_eq!(point.raw_data, "0048");
    assert_eq!(point.timestamp.to_rfc3339(), "2026-05-01T08:00:00+00:00");

    let record = collector.connection_record(STRAP).await.unwrap();
    assert_eq!(record.data_count, 1);
    assert!(record.last_data.is_some());

    let stats = collector.stats();
    assert_eq!(stats.total_collected, 1);
    assert_eq!(stats.for_type("heart_rate"), 1);
}

#[tokio::test]
async fn test_event_defaults() {
    let collector = collector_with_strap(1).await;

    let point = collector
        .collect(RawEvent {
            device_address: Some(STRAP.to_owned()),
            ..RawEvent::default()
        })
        .await
        .unwrap();

    assert_eq!(point.measurement_type.as_str(), "unknown");
    assert_eq!(point.value, 0.0);
    assert_eq!(point.confidence, 1.0);
}

#[tokio::test]
async fn test_malformed_timestamp_counts_error() {
    let collector = collector_with_strap(1).await;

    let result = collector
        .collect(event(STRAP, "heart_rate", 70.0, "yesterday-ish"))
        .await;

    assert!(matches!(result, Err(IngestError::InvalidTimestamp { .. })));
    let stats = collector.stats();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.total_collected, 0);
}

#[tokio::test]
async fn test_invalid_measurement_key_counts_error() {
    let collector = collector_with_strap(1).await;

    let result = collector
        .collect(event(STRAP, "heart rate!", 70.0, "2026-05-01T08:00:00Z"))
        .await;

    assert!(matches!(
        result,
        Err(IngestError::InvalidMeasurementType { .. })
    ));
    assert_eq!(collector.stats().errors, 1);
}

#[tokio::test]
async fn test_manual_entry_uses_sentinel_and_counts_once() {
    let collector = collector();

    let accepted = collector
        .collect_manual(9, "steps", 5000.0, None, None)
        .await
        .unwrap();
    assert!(accepted);

    let recent = collector.get_recent("steps", 10).await;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].device_address, "manual");
    assert_eq!(recent[0].device_type, DeviceType::ManualEntry);
    assert!(recent[0].is_manual());

    let stats = collector.stats();
    assert_eq!(stats.manual_entries, 1);
    assert_eq!(stats.for_type("steps"), 1);
    assert_eq!(stats.total_collected, 1);
}

#[tokio::test]
async fn test_manual_rejection_returns_false() {
    let collector = validating_collector();

    let accepted = collector
        .collect_manual(9, "heart_rate", 420.0, None, None)
        .await
        .unwrap();

    assert!(!accepted);
    let stats = collector.stats();
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.manual_entries, 0);
    assert!(collector.get_recent("heart_rate", 10).await.is_empty());
}

#[tokio::test]
async fn test_manual_invalid_key_is_error() {
    let collector = collector();
    let result = collector.collect_manual(9, "", 1.0, None, None).await;
    assert!(matches!(
        result,
        Err(IngestError::InvalidMeasurementType { .. })
    ));
}

#[tokio::test]
async fn test_device_rejection_counts_rejected() {
    let collector = validating_collector();
    collector
        .register_device(STRAP, 1, DeviceType::HeartRateMonitor)
        .await;

    let result = collector
        .collect(event(STRAP, "heart_rate", 0.0, "2026-05-01T08:00:00Z"))
        .await;

    assert!(result.as_ref().is_err_and(IngestError::is_rejection));
    assert_eq!(collector.stats().rejected, 1);
    assert_eq!(collector.stats().total_collected, 0);
}

#[tokio::test]
async fn test_validator_adjusts_confidence_with_clamp() {
    let collector = Arc::new(
        DataCollector::new(CollectorConfig::default()).with_validator(Arc::new(
            |_: &HealthDataPoint| ValidationOutcome::accept_with_confidence(1.8),
        )),
    );

    collector
        .collect_manual(1, "weight", 70.0, None, None)
        .await
        .unwrap();
    assert_eq!(collector.get_recent("weight", 1).await[0].confidence, 1.0);
}

#[tokio::test]
async fn test_buffer_keeps_last_capacity_points_in_order() {
    let collector = DataCollector::new(CollectorConfig {
        buffer_capacity: 5,
        ..CollectorConfig::default()
    });

    for value in 1..=12 {
        collector
            .collect_manual(1, "heart_rate", f64::from(value), None, None)
            .await
            .unwrap();
    }

    let values: Vec<f64> = collector
        .get_recent("heart_rate", 100)
        .await
        .iter()
        .map(|p| p.value)
        .collect();
    assert_eq!(values, vec![8.0, 9.0, 10.0, 11.0, 12.0]);
    assert_eq!(collector.stats().total_collected, 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_respect_capacity_and_counters() {
    const TASKS: u32 = 8;
    const PER_TASK: u32 = 25;
    const CAPACITY: usize = 16;

    let collector = Arc::new(DataCollector::new(CollectorConfig {
        buffer_capacity: CAPACITY,
        ..CollectorConfig::default()
    }));
    collector
        .register_device(STRAP, 1, DeviceType::HeartRateMonitor)
        .await;

    let mut handles = Vec::new();
    for task in 0..TASKS {
        let collector = collector.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..PER_TASK {
                let value = f64::from(60 + i);
                if task % 2 == 0 {
                    collector
                        .collect(event(STRAP, "heart_rate", value, "2026-05-01T08:00:00Z"))
                        .await
                        .unwrap();
                } else {
                    assert!(collector
                        .collect_manual(2, "heart_rate", value, None, None)
                        .await
                        .unwrap());
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = collector.stats();
    assert_eq!(stats.total_collected, u64::from(TASKS * PER_TASK));
    assert_eq!(stats.manual_entries, u64::from(TASKS / 2 * PER_TASK));
    assert_eq!(stats.errors, 0);
    assert_eq!(collector.get_recent("heart_rate", 1000).await.len(), CAPACITY);
    assert!(collector.buffers().total_points().await <= CAPACITY);
}

#[tokio::test]
async fn test_recent_limits_and_unknown_type() {
    let collector = collector();
    for value in [60.0, 61.0, 62.0] {
        collector
            .collect_manual(1, "heart_rate", value, None, None)
            .await
            .unwrap();
    }

    let last_two: Vec<f64> = collector
        .get_recent("heart_rate", 2)
        .await
        .iter()
        .map(|p| p.value)
        .collect();
    assert_eq!(last_two, vec![61.0, 62.0]);
    assert!(collector.get_recent("glucose", 5).await.is_empty());
}

#[tokio::test]
async fn test_user_recent_filters_before_limit() {
    let collector = collector();
    collector.collect_manual(1, "steps", 100.0, None, None).await.unwrap();
    collector.collect_manual(2, "steps", 200.0, None, None).await.unwrap();
    collector.collect_manual(1, "steps", 300.0, None, None).await.unwrap();
    collector.collect_manual(2, "steps", 400.0, None, None).await.unwrap();
    collector.collect_manual(2, "steps", 500.0, None, None).await.unwrap();

    let user_one: Vec<f64> = collector
        .get_user_recent(1, "steps", 2)
        .await
        .iter()
        .map(|p| p.value)
        .collect();
    assert_eq!(user_one, vec![100.0, 300.0]);
}

#[tokio::test]
async fn test_distinct_type_cap() {
    let collector = DataCollector::new(CollectorConfig {
        max_measurement_types: 2,
        ..CollectorConfig::default()
    });

    collector.collect_manual(1, "steps", 1.0, None, None).await.unwrap();
    collector.collect_manual(1, "calories", 1.0, None, None).await.unwrap();
    let third = collector.collect_manual(1, "distance", 1.0, None, None).await;

    assert!(matches!(
        third,
        Err(IngestError::TooManyMeasurementTypes { limit: 2, .. })
    ));
    // Existing keys still accept points
    assert!(collector
        .collect_manual(1, "steps", 2.0, None, None)
        .await
        .unwrap());
    assert_eq!(collector.stats().errors, 1);
}

#[tokio::test]
async fn test_unregister_is_idempotent_and_drops_later_events() {
    let collector = collector_with_strap(1).await;

    assert!(collector.unregister_device(STRAP).await);
    assert!(!collector.unregister_device(STRAP).await);

    let result = collector
        .collect(event(STRAP, "heart_rate", 70.0, "2026-05-01T08:00:00Z"))
        .await;
    assert!(result.as_ref().is_err_and(IngestError::is_unknown_device));
    assert!(collector.connection_record(STRAP).await.is_none());
}

#[tokio::test]
async fn test_reregister_replaces_record() {
    let collector = collector_with_strap(1).await;
    collector
        .collect(event(STRAP, "heart_rate", 70.0, "2026-05-01T08:00:00Z"))
        .await
        .unwrap();

    collector
        .register_device(STRAP, 2, DeviceType::FitnessTracker)
        .await;
    let record = collector.connection_record(STRAP).await.unwrap();
    assert_eq!(record.user_id, 2);
    assert_eq!(record.data_count, 0);
    assert_eq!(record.device_type, DeviceType::FitnessTracker);
}
