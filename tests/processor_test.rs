// ABOUTME: Integration tests for the background processor over in-memory storage
// ABOUTME: Routing by measurement type, nonzero-wins day rows, summaries and loop lifecycle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![allow(missing_docs, clippy::unwrap_used, clippy::float_cmp)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use common::{collector_with_strap, event, processor, STRAP};
use wearable_ingest::collector::DataCollector;
use wearable_ingest::config::ProcessorConfig;
use wearable_ingest::processor::{BackgroundProcessor, ProcessorError};
use wearable_ingest::storage::{InMemoryStorage, StorageGateway};

const DAY: &str = "2026-05-01T08:00:00Z";

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
}

async fn push(collector: &DataCollector, measurement_type: &str, value: f64, timestamp: &str) {
    collector
        .collect(event(STRAP, measurement_type, value, timestamp))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_heart_rate_points_become_samples() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);

    push(&collector, "heart_rate", 72.0, "2026-05-01T08:00:00Z").await;
    push(&collector, "heart_rate", 75.6, "2026-05-01T08:00:01Z").await;

    let report = processor.run_cycle().await.unwrap();

    assert_eq!(report.drained, 2);
    assert_eq!(report.stored, 2);
    let samples = storage.heart_rates().await;
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].heart_rate, 72);
    assert_eq!(samples[1].heart_rate, 75);
    assert_eq!(samples[0].device_id, STRAP);
    assert_eq!(samples[0].user_id, 1);
    assert_eq!(collector.buffers().total_points().await, 0);
}

#[tokio::test]
async fn test_activity_rows_merge_nonzero_fields() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);

    push(&collector, "steps", 5000.0, DAY).await;
    push(&collector, "calories", 300.0, DAY).await;
    processor.run_cycle().await.unwrap();

    let row = storage
        .get_daily_activity(1, may_first())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.steps, 5000);
    assert_eq!(row.calories, 300);

    // A later partial update replaces steps and keeps calories
    push(&collector, "steps", 6200.0, DAY).await;
    processor.run_cycle().await.unwrap();

    let row = storage
        .get_daily_activity(1, may_first())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.steps, 6200);
    assert_eq!(row.calories, 300);
}

#[tokio::test]
async fn test_sleep_rows_merge_nonzero_fields() {
    let collector = collector_with_strap(2).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);

    push(&collector, "sleep_duration", 420.0, DAY).await;
    push(&collector, "time_in_bed", 465.0, DAY).await;
    push(&collector, "sleep_efficiency", 90.3, DAY).await;
    processor.run_cycle().await.unwrap();

    let row = storage.get_sleep(2, may_first()).await.unwrap().unwrap();
    assert_eq!(row.records, 1);
    assert_eq!(row.minutes_asleep, 420);
    assert_eq!(row.time_in_bed, 465);
    assert_eq!(row.efficiency, 90.3);
}

#[tokio::test]
async fn test_unrouted_types_are_drained_without_writes() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);

    push(&collector, "weight", 71.4, DAY).await;
    push(&collector, "blood_pressure", 120.0, DAY).await;

    let report = processor.run_cycle().await.unwrap();

    assert_eq!(report.drained, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.stored, 0);
    assert_eq!(storage.write_count(), 0);
    assert_eq!(collector.buffers().total_points().await, 0);
}

#[tokio::test]
async fn test_storage_failure_fails_cycle_and_drops_points() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);
    storage.set_failing(true);

    push(&collector, "heart_rate", 70.0, DAY).await;
    push(&collector, "steps", 10.0, DAY).await;

    let err = processor.run_cycle().await.unwrap_err();
    assert!(matches!(
        err,
        ProcessorError::PersistFailed {
            failed: 2,
            attempted: 2,
            ..
        }
    ));
    assert_eq!(collector.buffers().total_points().await, 0);

    // Failed points are not retried
    storage.set_failing(false);
    let report = processor.run_cycle().await.unwrap();
    assert_eq!(report.drained, 0);
    assert!(storage.heart_rates().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_storage_times_out() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);
    storage.set_delay(Some(Duration::from_secs(5))).await;

    push(&collector, "heart_rate", 70.0, DAY).await;

    assert!(processor.run_cycle().await.is_err());
    assert_eq!(collector.buffers().total_points().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_points_collected_during_a_cycle_wait_for_the_next() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);
    storage.set_delay(Some(Duration::from_millis(500))).await;

    push(&collector, "heart_rate", 70.0, DAY).await;
    let cycle = tokio::spawn({
        let processor = processor.clone();
        async move { processor.run_cycle().await }
    });

    // The cycle is now blocked inside the storage write
    tokio::time::sleep(Duration::from_millis(100)).await;
    push(&collector, "heart_rate", 71.0, DAY).await;

    let report = cycle.await.unwrap().unwrap();
    assert_eq!(report.drained, 1);
    assert_eq!(collector.buffers().total_points().await, 1);

    storage.set_delay(None).await;
    let report = processor.run_cycle().await.unwrap();
    assert_eq!(report.drained, 1);
    assert_eq!(storage.heart_rates().await.len(), 2);
}

#[tokio::test]
async fn test_summaries_accumulate_within_the_day() {
    let collector = collector_with_strap(4).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);
    let now = Utc::now().to_rfc3339();

    push(&collector, "heart_rate", 60.0, &now).await;
    let first = processor.run_cycle().await.unwrap();
    assert_eq!(first.summaries, 1);

    push(&collector, "heart_rate", 80.0, &now).await;
    push(&collector, "steps", 1200.0, &now).await;
    processor.run_cycle().await.unwrap();

    let summaries = processor.summaries().await;
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.user_id, 4);
    assert_eq!(summary.date, Utc::now().date_naive());
    assert_eq!(summary.data_points, 3);
    let heart_rate = summary.metrics["heart_rate"];
    assert_eq!(heart_rate.count, 2);
    assert_eq!(heart_rate.avg, 70.0);
    assert_eq!(heart_rate.min, 60.0);
    assert_eq!(heart_rate.max, 80.0);
    assert!(summary.measurements.contains("steps"));

    let stored = storage.summaries().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].data_points, 3);
}

#[tokio::test]
async fn test_summaries_resume_from_storage_after_restart() {
    let collector = collector_with_strap(4).await;
    let storage = Arc::new(InMemoryStorage::new());
    let now = Utc::now().to_rfc3339();

    let first = processor(&collector, &storage);
    push(&collector, "heart_rate", 60.0, &now).await;
    push(&collector, "heart_rate", 70.0, &now).await;
    first.run_cycle().await.unwrap();

    // A new processor starts with an empty cache
    let restarted = processor(&collector, &storage);
    push(&collector, "heart_rate", 80.0, &now).await;
    restarted.run_cycle().await.unwrap();

    let stored = storage.summaries().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].data_points, 3);
    let heart_rate = stored[0].metrics["heart_rate"];
    assert_eq!(heart_rate.count, 3);
    assert_eq!(heart_rate.min, 60.0);
    assert_eq!(heart_rate.max, 80.0);
    assert_eq!(heart_rate.avg, 70.0);
}

#[tokio::test]
async fn test_summaries_skip_old_days_and_manual_users() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);

    push(&collector, "heart_rate", 65.0, DAY).await;
    collector
        .collect_manual(99, "heart_rate", 70.0, None, None)
        .await
        .unwrap();

    let report = processor.run_cycle().await.unwrap();

    assert_eq!(report.stored, 2);
    assert_eq!(report.summaries, 0);
    assert!(processor.summaries().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_loop_processes_on_interval() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let config = ProcessorConfig {
        interval: Duration::from_secs(30),
        storage_timeout: Duration::from_secs(1),
        ..ProcessorConfig::default()
    };
    let processor = Arc::new(BackgroundProcessor::new(
        collector.clone(),
        storage.clone(),
        config,
    ));

    assert!(processor.start().await);
    assert!(!processor.start().await);
    assert!(processor.is_running().await);

    tokio::time::sleep(Duration::from_secs(1)).await;
    push(&collector, "heart_rate", 66.0, DAY).await;
    assert!(storage.heart_rates().await.is_empty());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(storage.heart_rates().await.len(), 1);

    processor.stop().await;
    assert!(!processor.is_running().await);
    // Stopping twice is harmless
    processor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_failed_cycles() {
    let collector = collector_with_strap(1).await;
    let storage = Arc::new(InMemoryStorage::new());
    let processor = processor(&collector, &storage);
    storage.set_failing(true);
    push(&collector, "heart_rate", 66.0, DAY).await;

    assert!(processor.start().await);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(processor.is_running().await);
    assert_eq!(collector.buffers().total_points().await, 0);

    storage.set_failing(false);
    push(&collector, "heart_rate", 67.0, DAY).await;
    // Default backoff is 60s
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(storage.heart_rates().await.len(), 1);

    processor.stop().await;
}
