// ABOUTME: Device model - declared types, connection states, advertisements and GATT tables
// ABOUTME: Snapshot types returned by the scanner for discovered and connected devices

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declared kind of a health device
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Chest strap or optical heart-rate sensor
    HeartRateMonitor,
    /// Body weight scale
    WeightScale,
    /// Blood pressure cuff
    BloodPressureMonitor,
    /// Blood glucose meter
    GlucoseMeter,
    /// Wrist band, watch or clip-on activity tracker
    FitnessTracker,
    /// Health device that matched no specific category
    HealthDevice,
    /// Data typed in by a user rather than read from hardware
    ManualEntry,
    /// Nothing is known about the device
    #[default]
    Unknown,
}

impl DeviceType {
    /// Wire label (`heart_rate_monitor`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeartRateMonitor => "heart_rate_monitor",
            Self::WeightScale => "weight_scale",
            Self::BloodPressureMonitor => "blood_pressure_monitor",
            Self::GlucoseMeter => "glucose_meter",
            Self::FitnessTracker => "fitness_tracker",
            Self::HealthDevice => "health_device",
            Self::ManualEntry => "manual_entry",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a wire label, falling back to `Unknown`
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "heart_rate_monitor" => Self::HeartRateMonitor,
            "weight_scale" => Self::WeightScale,
            "blood_pressure_monitor" => Self::BloodPressureMonitor,
            "glucose_meter" => Self::GlucoseMeter,
            "fitness_tracker" => Self::FitnessTracker,
            "health_device" => Self::HealthDevice,
            "manual_entry" => Self::ManualEntry,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a device is in its lifecycle
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Seen in a scan, never connected
    Discovered,
    /// Connection open
    Connected,
    /// Connection open with notifications flowing
    Monitoring,
    /// Connection closed
    Disconnected,
}

/// A device known to the scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Address (unique key)
    pub address: String,
    /// Advertised name, if any
    pub name: Option<String>,
    /// Declared type
    pub device_type: DeviceType,
    /// Service UUIDs seen on the device
    pub services: Vec<String>,
    /// Lifecycle state
    pub state: ConnectionState,
    /// Last time anything happened on this device
    pub last_activity: DateTime<Utc>,
}

/// One advertisement returned by transport discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAdvertisement {
    /// Advertised local name
    pub name: Option<String>,
    /// Device address
    pub address: String,
    /// Received signal strength
    pub rssi: Option<i16>,
}

/// Health device accepted by a discovery pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Advertised name
    pub name: String,
    /// Device address
    pub address: String,
    /// Received signal strength
    pub rssi: Option<i16>,
    /// Service UUIDs, empty when enumeration failed
    pub services: Vec<String>,
    /// Heuristic classification from the name
    pub device_type: DeviceType,
    /// When the device was seen
    pub discovered_at: DateTime<Utc>,
}

/// GATT characteristic description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattCharacteristic {
    /// Characteristic UUID
    pub uuid: String,
    /// Property names (`read`, `notify`, ...)
    pub properties: Vec<String>,
    /// Descriptor UUIDs
    pub descriptors: Vec<String>,
}

/// GATT service with its characteristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattService {
    /// Service UUID
    pub uuid: String,
    /// Human readable description, if the stack knows one
    pub description: Option<String>,
    /// Characteristics exposed by the service
    pub characteristics: Vec<GattCharacteristic>,
}

/// Snapshot of a connected device, taken at connect time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device address
    pub address: String,
    /// Name read from the device-name characteristic
    pub name: Option<String>,
    /// Manufacturer read from the manufacturer-name characteristic
    pub manufacturer: Option<String>,
    /// When the connection opened
    pub connected_at: DateTime<Utc>,
    /// Full service table
    pub services: Vec<GattService>,
}

impl DeviceInfo {
    /// Whether the device exposes a service
    #[must_use]
    pub fn has_service(&self, uuid: &str) -> bool {
        self.services.iter().any(|s| s.uuid.eq_ignore_ascii_case(uuid))
    }

    /// Whether any service exposes a characteristic
    #[must_use]
    pub fn has_characteristic(&self, uuid: &str) -> bool {
        self.characteristics().any(|c| c.uuid.eq_ignore_ascii_case(uuid))
    }

    /// All characteristics across services
    pub fn characteristics(&self) -> impl Iterator<Item = &GattCharacteristic> {
        self.services.iter().flat_map(|s| s.characteristics.iter())
    }

    /// Service UUIDs only
    #[must_use]
    pub fn service_uuids(&self) -> Vec<String> {
        self.services.iter().map(|s| s.uuid.clone()).collect()
    }
}
