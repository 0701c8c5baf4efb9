// ABOUTME: Health data point model and the raw event shape delivered by device notifications
// ABOUTME: Includes lenient ISO-8601 timestamp parsing for device and manual payloads

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::DeviceType;
use super::measurement::MeasurementType;
use crate::constants::measurements::MANUAL_DEVICE_ADDRESS;
use crate::errors::IngestError;

/// User identifier owned by the surrounding application
pub type UserId = i64;

/// Open key/value metadata attached to a point
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Structured, validated health reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDataPoint {
    /// Owning user
    pub user_id: UserId,
    /// Source device address, or `"manual"`
    pub device_address: String,
    /// Source device type
    pub device_type: DeviceType,
    /// Measurement key
    pub measurement_type: MeasurementType,
    /// Numeric reading
    pub value: f64,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Raw payload as hex, empty when not applicable
    pub raw_data: String,
    /// Free-form metadata
    pub metadata: Metadata,
}

impl HealthDataPoint {
    /// Create a point with full confidence and no payload
    #[must_use]
    pub fn new(
        user_id: UserId,
        device_address: impl Into<String>,
        device_type: DeviceType,
        measurement_type: MeasurementType,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            device_address: device_address.into(),
            device_type,
            measurement_type,
            value,
            timestamp,
            confidence: 1.0,
            raw_data: String::new(),
            metadata: Metadata::new(),
        }
    }

    /// Attach the raw payload hex
    #[must_use]
    pub fn with_raw_data(mut self, raw_data: impl Into<String>) -> Self {
        self.raw_data = raw_data.into();
        self
    }

    /// Attach metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set confidence, clamped to [0, 1] (NaN becomes 0)
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// Whether the point was entered by hand
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.device_address == MANUAL_DEVICE_ADDRESS
    }

    /// UTC calendar day of the reading
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Raw event as produced by a device notification or posted by a client
///
/// Every field is optional; the collector applies defaults and rejects
/// events whose device is not registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Source device address
    #[serde(default)]
    pub device_address: Option<String>,
    /// Source device type label
    #[serde(default)]
    pub device_type: Option<String>,
    /// Measurement key
    #[serde(default)]
    pub measurement_type: Option<String>,
    /// Numeric reading
    #[serde(default)]
    pub value: Option<f64>,
    /// ISO-8601 timestamp
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Raw payload hex
    #[serde(default)]
    pub raw_data: Option<String>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Parse an ISO-8601-like timestamp
///
/// Accepts RFC 3339 with an offset, naive `T`- or space-separated date-times
/// (with optional fractional seconds), and bare dates (midnight). Naive values
/// are read as UTC.
///
/// # Errors
///
/// Returns `IngestError::InvalidTimestamp` when no format matches
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, IngestError> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| IngestError::InvalidTimestamp {
            value: value.to_owned(),
        })
}
