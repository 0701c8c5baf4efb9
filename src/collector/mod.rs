// ABOUTME: Data collector - single ingestion point for device notifications and manual entries
// ABOUTME: Resolves owners, validates, buffers, counts and fans out accepted health data points
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Data Collector
//!
//! [`DataCollector::collect`] takes a [`RawEvent`] from a registered device,
//! turns it into a [`HealthDataPoint`], and routes it through the optional
//! validator into the per-type buffers. Accepted points are handed to every
//! observer in registration order and then published on the event bus.
//!
//! The collector owns three independent pieces of state: the buffer registry,
//! the device registry, and the counters. None of their locks is held while a
//! validator or observer runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use wearable_core::constants::measurements::MANUAL_DEVICE_ADDRESS;
use wearable_core::errors::IngestError;
use wearable_core::models::{
    parse_timestamp, DeviceType, HealthDataPoint, MeasurementType, Metadata, RawEvent, UserId,
};

use crate::config::CollectorConfig;

/// Bounded per-type point buffer
pub mod buffer;
/// Observer fan-out and event bus
pub mod observers;
/// Buffer and device registries
pub mod registry;
/// Collection counters
pub mod stats;
/// Point validation
pub mod validation;

pub use buffer::DataBuffer;
pub use observers::{DataObserver, EventBus, ObserverSet};
pub use registry::{ConnectionRecord, DataBufferRegistry, DeviceRegistry};
pub use stats::{CollectionStats, StatKey, StatsSnapshot};
pub use validation::{DataValidator, RangeValidator, ValidationOutcome};

/// Consumer of raw events produced by the scanner's notification tasks
#[async_trait]
pub trait DataSink: Send + Sync {
    /// Accept one raw event; failures are the sink's to report
    async fn deliver(&self, event: RawEvent);
}

/// Ingestion front door
pub struct DataCollector {
    buffers: DataBufferRegistry,
    devices: DeviceRegistry,
    stats: CollectionStats,
    validator: Option<Arc<dyn DataValidator>>,
    observers: ObserverSet,
    events: EventBus,
}

impl DataCollector {
    /// Collector without a validator
    #[must_use]
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            buffers: DataBufferRegistry::new(config.buffer_capacity, config.max_measurement_types),
            devices: DeviceRegistry::new(),
            stats: CollectionStats::new(),
            validator: None,
            observers: ObserverSet::default(),
            events: EventBus::new(config.event_channel_capacity),
        }
    }

    /// Install a validator
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn DataValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Upsert the owner and connection record of a device
    pub async fn register_device(&self, address: &str, user_id: UserId, device_type: DeviceType) {
        self.devices.register(address, user_id, device_type).await;
        debug!(device = %address, user_id, device_type = %device_type, "Device registered");
    }

    /// Forget a device; returns whether it was registered
    pub async fn unregister_device(&self, address: &str) -> bool {
        let removed = self.devices.unregister(address).await;
        if removed {
            debug!(device = %address, "Device unregistered");
        }
        removed
    }

    /// Restore a registration exactly as captured by [`DataCollector::connection_record`]
    pub async fn reinstate_device(&self, address: &str, record: ConnectionRecord) {
        debug!(device = %address, user_id = record.user_id, "Device registration restored");
        self.devices.reinstate(address, record).await;
    }

    /// Ingest an event from a registered device
    ///
    /// # Errors
    ///
    /// - `UnknownDevice` when the address is missing or unregistered (no
    ///   counter changes)
    /// - `InvalidTimestamp`, `InvalidMeasurementType` or
    ///   `TooManyMeasurementTypes` for malformed points (`errors` counter)
    /// - `ValidationRejected` when the validator declines (`rejected` counter)
    pub async fn collect(&self, event: RawEvent) -> Result<Arc<HealthDataPoint>, IngestError> {
        let Some(address) = event.device_address.clone() else {
            warn!("Dropping event without a device address");
            return Err(IngestError::UnknownDevice { address: None });
        };
        let Some((user_id, registered_type)) = self.devices.resolve(&address).await else {
            warn!(device = %address, "Dropping event from unregistered device");
            return Err(IngestError::UnknownDevice {
                address: Some(address),
            });
        };

        let point = Self::build_point(user_id, address, registered_type, event)
            .inspect_err(|e| self.count_error(e))?;
        self.ingest(point, false).await
    }

    /// Ingest a hand-entered value
    ///
    /// Returns `Ok(false)` when the validator rejects the value.
    ///
    /// # Errors
    ///
    /// Returns an error only for an invalid measurement key or when the
    /// distinct-type cap is reached
    pub async fn collect_manual(
        &self,
        user_id: UserId,
        measurement_type: &str,
        value: f64,
        timestamp: Option<DateTime<Utc>>,
        metadata: Option<Metadata>,
    ) -> Result<bool, IngestError> {
        let measurement_type =
            MeasurementType::parse(measurement_type).inspect_err(|e| self.count_error(e))?;

        let point = HealthDataPoint::new(
            user_id,
            MANUAL_DEVICE_ADDRESS,
            DeviceType::ManualEntry,
            measurement_type,
            value,
            timestamp.unwrap_or_else(Utc::now),
        )
        .with_metadata(metadata.unwrap_or_default());

        match self.ingest(point, true).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_rejection() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn build_point(
        user_id: UserId,
        address: String,
        registered_type: DeviceType,
        event: RawEvent,
    ) -> Result<HealthDataPoint, IngestError> {
        let measurement_type = event
            .measurement_type
            .as_deref()
            .map_or_else(|| Ok(MeasurementType::unknown()), MeasurementType::parse)?;
        let timestamp = event
            .timestamp
            .as_deref()
            .map_or_else(|| Ok(Utc::now()), parse_timestamp)?;
        let device_type = event
            .device_type
            .as_deref()
            .map_or(registered_type, DeviceType::from_label);

        Ok(HealthDataPoint::new(
            user_id,
            address,
            device_type,
            measurement_type,
            event.value.unwrap_or(0.0),
            timestamp,
        )
        .with_raw_data(event.raw_data.unwrap_or_default())
        .with_metadata(event.metadata.unwrap_or_default()))
    }

    /// Validate, buffer, count and fan out one point
    ///
    /// Every counter is updated before observers and subscribers see the point.
    async fn ingest(
        &self,
        mut point: HealthDataPoint,
        manual: bool,
    ) -> Result<Arc<HealthDataPoint>, IngestError> {
        if let Some(validator) = &self.validator {
            match validator.validate(&point) {
                ValidationOutcome::Accept { confidence } => {
                    if let Some(confidence) = confidence {
                        point = point.with_confidence(confidence);
                    }
                }
                ValidationOutcome::Reject { reason } => {
                    warn!(
                        device = %point.device_address,
                        measurement_type = %point.measurement_type,
                        value = point.value,
                        reason = %reason,
                        "Validation rejected data point"
                    );
                    self.stats.increment(StatKey::Rejected);
                    return Err(IngestError::ValidationRejected {
                        measurement_type: point.measurement_type.to_string(),
                        reason,
                    });
                }
            }
        }

        let point = Arc::new(point);
        self.buffers
            .append(Arc::clone(&point))
            .await
            .inspect_err(|e| self.count_error(e))?;

        if manual {
            self.stats.increment(StatKey::ManualEntries);
        } else {
            self.devices.touch(&point.device_address).await;
        }
        self.stats.increment(StatKey::TotalCollected);
        self.stats
            .increment(StatKey::Measurement(point.measurement_type.clone()));

        debug!(
            device = %point.device_address,
            measurement_type = %point.measurement_type,
            value = point.value,
            "Data point buffered"
        );

        self.observers.notify(&point).await;
        self.events.publish(Arc::clone(&point));
        Ok(point)
    }

    fn count_error(&self, error: &IngestError) {
        warn!(error = %error, "Malformed data point");
        self.stats.increment(StatKey::Errors);
    }

    /// Up to `limit` most recent points of a type, oldest first
    pub async fn get_recent(&self, measurement_type: &str, limit: usize) -> Vec<Arc<HealthDataPoint>> {
        match MeasurementType::parse(measurement_type) {
            Ok(key) => self.buffers.recent(&key, limit).await,
            Err(_) => Vec::new(),
        }
    }

    /// Up to `limit` most recent points of a type owned by `user_id`, oldest first
    pub async fn get_user_recent(
        &self,
        user_id: UserId,
        measurement_type: &str,
        limit: usize,
    ) -> Vec<Arc<HealthDataPoint>> {
        match MeasurementType::parse(measurement_type) {
            Ok(key) => self.buffers.recent_for_user(user_id, &key, limit).await,
            Err(_) => Vec::new(),
        }
    }

    /// Register a fan-out observer; there is no removal
    pub async fn add_observer(&self, observer: Arc<dyn DataObserver>) {
        self.observers.add(observer).await;
    }

    /// Receive every accepted point from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HealthDataPoint>> {
        self.events.subscribe()
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Connection record of a registered device
    pub async fn connection_record(&self, address: &str) -> Option<ConnectionRecord> {
        self.devices.record(address).await
    }

    /// Address to owning user snapshot
    pub async fn device_users(&self) -> HashMap<String, UserId> {
        self.devices.user_map().await
    }

    /// Buffer registry, drained by the background processor
    #[must_use]
    pub const fn buffers(&self) -> &DataBufferRegistry {
        &self.buffers
    }
}

#[async_trait]
impl DataSink for DataCollector {
    async fn deliver(&self, event: RawEvent) {
        if let Err(e) = self.collect(event).await {
            debug!(error = %e, "Notification event not buffered");
        }
    }
}
