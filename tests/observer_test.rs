// ABOUTME: Integration tests for observer fan-out and the event bus
// ABOUTME: Failing or panicking observers must not block ingestion or later observers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![allow(missing_docs, clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{collector, collector_with_strap, event, STRAP};
use wearable_ingest::collector::DataObserver;
use wearable_ingest::errors::ObserverError;
use wearable_ingest::models::HealthDataPoint;

#[tokio::test]
async fn test_failing_observer_does_not_block_others() {
    let collector = collector_with_strap(1).await;
    let seen = Arc::new(AtomicUsize::new(0));

    let failing: Arc<dyn DataObserver> =
        Arc::new(|_: &HealthDataPoint| -> Result<(), ObserverError> {
            Err(ObserverError::failed("downstream offline"))
        });
    collector.add_observer(failing).await;

    let counter = seen.clone();
    let counting: Arc<dyn DataObserver> = Arc::new(move |_: &HealthDataPoint| -> Result<(), ObserverError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    collector.add_observer(counting).await;

    collector
        .collect(event(STRAP, "heart_rate", 70.0, "2026-05-01T08:00:00Z"))
        .await
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(collector.stats().total_collected, 1);
}

#[tokio::test]
async fn test_panicking_observer_is_isolated() {
    let collector = collector();
    let seen = Arc::new(AtomicUsize::new(0));

    let panicking: Arc<dyn DataObserver> =
        Arc::new(|_: &HealthDataPoint| -> Result<(), ObserverError> { panic!("observer bug") });
    collector.add_observer(panicking).await;

    let counter = seen.clone();
    let counting: Arc<dyn DataObserver> = Arc::new(move |_: &HealthDataPoint| -> Result<(), ObserverError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    collector.add_observer(counting).await;

    let accepted = collector
        .collect_manual(3, "weight", 71.5, None, None)
        .await
        .unwrap();

    assert!(accepted);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(collector.stats().manual_entries, 1);
}

#[tokio::test]
async fn test_observers_see_updated_counters() {
    let collector = collector();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let handle = Arc::downgrade(&collector);
    let recorded = seen.clone();
    let reading: Arc<dyn DataObserver> = Arc::new(move |_: &HealthDataPoint| -> Result<(), ObserverError> {
        if let Some(collector) = handle.upgrade() {
            let stats = collector.stats();
            recorded
                .lock()
                .unwrap()
                .push((stats.total_collected, stats.manual_entries));
        }
        Ok(())
    });
    collector.add_observer(reading).await;

    collector
        .collect_manual(5, "steps", 4200.0, None, None)
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(1, 1)]);
}

#[tokio::test]
async fn test_observers_run_in_registration_order() {
    let collector = collector();
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["first", "second", "third"] {
        let order = order.clone();
        let observer: Arc<dyn DataObserver> = Arc::new(move |_: &HealthDataPoint| -> Result<(), ObserverError> {
            order.lock().unwrap().push(name);
            Ok(())
        });
        collector.add_observer(observer).await;
    }

    collector
        .collect_manual(1, "steps", 10.0, None, None)
        .await
        .unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_rejected_points_are_not_fanned_out() {
    let collector = common::validating_collector();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let observer: Arc<dyn DataObserver> = Arc::new(move |_: &HealthDataPoint| -> Result<(), ObserverError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    collector.add_observer(observer).await;
    let mut events = collector.subscribe();

    collector
        .collect_manual(1, "heart_rate", 999.0, None, None)
        .await
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 0);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_event_bus_delivers_to_subscriber_task() {
    let collector = collector_with_strap(5).await;
    let mut events = collector.subscribe();

    let consumer = tokio::spawn(async move {
        let mut values = Vec::new();
        while values.len() < 3 {
            let point = events.recv().await.unwrap();
            values.push(point.value);
        }
        values
    });

    for (i, bpm) in [61.0, 62.0, 63.0].into_iter().enumerate() {
        collector
            .collect(event(
                STRAP,
                "heart_rate",
                bpm,
                &format!("2026-05-01T08:00:0{i}Z"),
            ))
            .await
            .unwrap();
    }

    assert_eq!(consumer.await.unwrap(), vec![61.0, 62.0, 63.0]);
}
