// ABOUTME: Transport error types for BLE discovery, connection and notification failures
// ABOUTME: Surfaced to callers as boolean failures by the scanner, never fatal to the scan loop

use std::time::Duration;

/// Errors raised by a device transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Discovery could not run
    #[error("Discovery failed: {reason}")]
    Discovery {
        /// Underlying reason
        reason: String,
    },

    /// No device answers at this address
    #[error("Device {address} not found")]
    NotFound {
        /// Target address
        address: String,
    },

    /// Connection attempt failed
    #[error("Connection to {address} failed: {reason}")]
    ConnectFailed {
        /// Target address
        address: String,
        /// Underlying reason
        reason: String,
    },

    /// Operation requires an open connection
    #[error("Device {address} is not connected")]
    NotConnected {
        /// Target address
        address: String,
    },

    /// Characteristic is not exposed by the device
    #[error("Characteristic {uuid} unavailable on {address}")]
    CharacteristicUnavailable {
        /// Device address
        address: String,
        /// Characteristic UUID
        uuid: String,
    },

    /// GATT service listing failed
    #[error("Service discovery on {address} failed: {reason}")]
    ServiceDiscovery {
        /// Device address
        address: String,
        /// Backend error text
        reason: String,
    },

    /// Characteristic read failed
    #[error("Read of {uuid} on {address} failed: {reason}")]
    ReadFailed {
        /// Device address
        address: String,
        /// Characteristic UUID
        uuid: String,
        /// Underlying reason
        reason: String,
    },

    /// Notification subscription failed
    #[error("Subscribe to {uuid} on {address} failed: {reason}")]
    SubscribeFailed {
        /// Device address
        address: String,
        /// Characteristic UUID
        uuid: String,
        /// Underlying reason
        reason: String,
    },

    /// Disconnect did not complete cleanly
    #[error("Disconnect from {address} failed: {reason}")]
    DisconnectFailed {
        /// Device address
        address: String,
        /// Underlying reason
        reason: String,
    },

    /// Transport call exceeded its deadline
    #[error("Transport {operation} timed out after {after:?}")]
    Timeout {
        /// Operation name
        operation: &'static str,
        /// Deadline that elapsed
        after: Duration,
    },
}
