// ABOUTME: Integration tests for the SQLite storage gateway
// ABOUTME: Runs against in-memory and temporary file databases
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![cfg(feature = "sqlite")]
#![allow(missing_docs, clippy::unwrap_used, clippy::float_cmp)]

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, TimeZone, Utc};
use wearable_ingest::models::{DailyActivity, DailySleep, DailySummary, MeasurementSummary};
use wearable_ingest::storage::{SqliteStorage, StorageGateway};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
}

async fn memory_storage() -> SqliteStorage {
    SqliteStorage::new("sqlite::memory:").await.unwrap()
}

#[tokio::test]
async fn test_heart_rate_samples_round_trip() {
    let storage = memory_storage().await;
    let at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();

    storage.store_heart_rate(1, at, 72, "AA:BB").await.unwrap();
    storage.store_heart_rate(2, at, 90, "CC:DD").await.unwrap();

    let samples = storage.heart_rates(1).await.unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].heart_rate, 72);
    assert_eq!(samples[0].timestamp, at);
    assert_eq!(samples[0].device_id, "AA:BB");
}

#[tokio::test]
async fn test_activity_upsert_replaces_row() {
    let storage = memory_storage().await;
    assert!(storage.get_daily_activity(1, day()).await.unwrap().is_none());

    let first = DailyActivity {
        steps: 5000,
        calories: 300,
        ..DailyActivity::default()
    };
    storage.store_daily_activity(1, day(), &first).await.unwrap();

    let second = DailyActivity {
        steps: 6200,
        distance: 4.1,
        ..first
    };
    storage.store_daily_activity(1, day(), &second).await.unwrap();

    let row = storage.get_daily_activity(1, day()).await.unwrap().unwrap();
    assert_eq!(row, second);
    assert!(storage.get_daily_activity(2, day()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sleep_upsert_replaces_row() {
    let storage = memory_storage().await;
    let sleep = DailySleep {
        minutes_asleep: 420,
        time_in_bed: 465,
        efficiency: 90.3,
        ..DailySleep::default()
    };

    storage.store_sleep(3, day(), &sleep).await.unwrap();
    storage.store_sleep(3, day(), &sleep).await.unwrap();

    assert_eq!(storage.get_sleep(3, day()).await.unwrap(), Some(sleep));
}

#[tokio::test]
async fn test_summary_round_trip() {
    let storage = memory_storage().await;
    let mut metrics = BTreeMap::new();
    metrics.insert(
        "heart_rate".to_owned(),
        MeasurementSummary {
            avg: 70.0,
            min: 60.0,
            max: 80.0,
            count: 2,
        },
    );
    let summary = DailySummary {
        user_id: 4,
        date: day(),
        data_points: 2,
        measurements: BTreeSet::from(["heart_rate".to_owned()]),
        metrics,
    };

    storage.store_daily_summary(&summary).await.unwrap();

    let loaded = storage.get_daily_summary(4, day()).await.unwrap().unwrap();
    assert_eq!(loaded.data_points, 2);
    assert_eq!(loaded.measurements, summary.measurements);
    assert_eq!(loaded.metrics["heart_rate"].avg, 70.0);
    assert_eq!(loaded.metrics["heart_rate"].count, 2);
}

#[tokio::test]
async fn test_file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("ingest.db").display());
    let activity = DailyActivity {
        steps: 1234,
        ..DailyActivity::default()
    };

    {
        let storage = SqliteStorage::new(&url).await.unwrap();
        storage
            .store_daily_activity(9, day(), &activity)
            .await
            .unwrap();
    }

    let reopened = SqliteStorage::new(&url).await.unwrap();
    assert_eq!(
        reopened.get_daily_activity(9, day()).await.unwrap(),
        Some(activity)
    );
}
