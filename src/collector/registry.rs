// ABOUTME: Registries owned by the collector - measurement buffers and the device-to-user map
// ABOUTME: Each registry sits behind its own tokio RwLock; no lock outlives a single call

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use wearable_core::errors::IngestError;
use wearable_core::models::{DeviceType, HealthDataPoint, MeasurementType, UserId};

use super::buffer::DataBuffer;

/// Buffers keyed by measurement type, created lazily up to a cap
pub struct DataBufferRegistry {
    capacity: usize,
    max_types: usize,
    buffers: RwLock<HashMap<MeasurementType, DataBuffer>>,
}

impl DataBufferRegistry {
    /// Registry whose buffers hold `capacity` points and which admits at most `max_types` keys
    #[must_use]
    pub fn new(capacity: usize, max_types: usize) -> Self {
        Self {
            capacity,
            max_types,
            buffers: RwLock::new(HashMap::new()),
        }
    }

    /// Append a point to the buffer for its measurement type
    ///
    /// # Errors
    ///
    /// Returns `IngestError::TooManyMeasurementTypes` when the point would
    /// create a buffer past the configured cap
    pub async fn append(&self, point: Arc<HealthDataPoint>) -> Result<(), IngestError> {
        let mut buffers = self.buffers.write().await;
        if !buffers.contains_key(&point.measurement_type) && buffers.len() >= self.max_types {
            return Err(IngestError::TooManyMeasurementTypes {
                measurement_type: point.measurement_type.to_string(),
                limit: self.max_types,
            });
        }
        buffers
            .entry(point.measurement_type.clone())
            .or_insert_with(|| DataBuffer::new(self.capacity))
            .push(point);
        Ok(())
    }

    /// Most recent points of a type, oldest first
    pub async fn recent(
        &self,
        measurement_type: &MeasurementType,
        limit: usize,
    ) -> Vec<Arc<HealthDataPoint>> {
        self.buffers
            .read()
            .await
            .get(measurement_type)
            .map(|b| b.recent(limit))
            .unwrap_or_default()
    }

    /// Most recent points of a type for one user, oldest first
    pub async fn recent_for_user(
        &self,
        user_id: UserId,
        measurement_type: &MeasurementType,
        limit: usize,
    ) -> Vec<Arc<HealthDataPoint>> {
        self.buffers
            .read()
            .await
            .get(measurement_type)
            .map(|b| b.recent_for_user(user_id, limit))
            .unwrap_or_default()
    }

    /// Snapshot and clear every non-empty buffer in one step
    pub async fn drain_all(&self) -> Vec<(MeasurementType, Vec<Arc<HealthDataPoint>>)> {
        let mut buffers = self.buffers.write().await;
        let mut drained: Vec<_> = buffers
            .iter_mut()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(measurement_type, buffer)| (measurement_type.clone(), buffer.drain()))
            .collect();
        drained.sort_by(|(a, _), (b, _)| a.cmp(b));
        drained
    }

    /// Number of points across every buffer
    pub async fn total_points(&self) -> usize {
        self.buffers.read().await.values().map(DataBuffer::len).sum()
    }
}

/// Bookkeeping for one registered device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    /// Owning user
    pub user_id: UserId,
    /// Declared device type
    pub device_type: DeviceType,
    /// When the device was registered
    pub connected_at: DateTime<Utc>,
    /// When the last accepted point arrived
    pub last_data: Option<DateTime<Utc>>,
    /// Accepted points since registration
    pub data_count: u64,
}

/// Device address to owning user map with per-device connection records
#[derive(Default)]
pub struct DeviceRegistry {
    records: RwLock<HashMap<String, ConnectionRecord>>,
}

impl DeviceRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `address`
    pub async fn register(&self, address: &str, user_id: UserId, device_type: DeviceType) {
        let record = ConnectionRecord {
            user_id,
            device_type,
            connected_at: Utc::now(),
            last_data: None,
            data_count: 0,
        };
        self.records
            .write()
            .await
            .insert(address.to_owned(), record);
    }

    /// Put back a record captured earlier, unchanged
    pub async fn reinstate(&self, address: &str, record: ConnectionRecord) {
        self.records
            .write()
            .await
            .insert(address.to_owned(), record);
    }

    /// Remove the record for `address`, returning whether one existed
    pub async fn unregister(&self, address: &str) -> bool {
        self.records.write().await.remove(address).is_some()
    }

    /// Owning user and declared type of a registered device
    pub async fn resolve(&self, address: &str) -> Option<(UserId, DeviceType)> {
        self.records
            .read()
            .await
            .get(address)
            .map(|r| (r.user_id, r.device_type))
    }

    /// Record an accepted point; no-op if the device was unregistered meanwhile
    pub async fn touch(&self, address: &str) {
        if let Some(record) = self.records.write().await.get_mut(address) {
            record.last_data = Some(Utc::now());
            record.data_count += 1;
        }
    }

    /// Copy of one record
    pub async fn record(&self, address: &str) -> Option<ConnectionRecord> {
        self.records.read().await.get(address).cloned()
    }

    /// Snapshot of the address to user mapping
    pub async fn user_map(&self) -> HashMap<String, UserId> {
        self.records
            .read()
            .await
            .iter()
            .map(|(address, record)| (address.clone(), record.user_id))
            .collect()
    }
}
