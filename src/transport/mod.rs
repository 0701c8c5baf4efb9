// ABOUTME: BLE transport abstraction consumed by the device scanner
// ABOUTME: Narrow async traits for discovery, connections, characteristic reads and notifications
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Device Transport
//!
//! The scanner never talks to a Bluetooth stack directly. It drives a
//! [`DeviceTransport`] for discovery and connections, and a [`Connection`]
//! for everything that happens on an open link. Notifications arrive on a
//! bounded `mpsc` channel per subscribed characteristic; the channel closes
//! when the link goes away.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use wearable_core::errors::TransportError;
use wearable_core::models::{DeviceAdvertisement, GattService};

/// In-process transport for tests and demos
pub mod simulated;

pub use simulated::{SimulatedDevice, SimulatedTransport};

/// Entry point into a BLE stack
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Listen for advertisements for `window` and return what was seen
    async fn discover(&self, window: Duration) -> Result<Vec<DeviceAdvertisement>, TransportError>;

    /// Open a connection to `address`
    async fn connect(&self, address: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// One open link to a device
#[async_trait]
pub trait Connection: Send + Sync {
    /// Address of the remote device
    fn address(&self) -> &str;

    /// Enumerate GATT services and their characteristics
    async fn list_services(&self) -> Result<Vec<GattService>, TransportError>;

    /// Read a characteristic value
    async fn read_characteristic(&self, uuid: &str) -> Result<Vec<u8>, TransportError>;

    /// Subscribe to notifications on a characteristic
    async fn subscribe(&self, uuid: &str) -> Result<mpsc::Receiver<Vec<u8>>, TransportError>;

    /// Close the link
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Whether the link is still open
    fn is_connected(&self) -> bool;
}

/// Run a transport call under a deadline
///
/// # Errors
///
/// Returns the call's own error, or `TransportError::Timeout` when the
/// deadline elapses first
pub async fn with_timeout<T, F>(
    operation: &'static str,
    after: Duration,
    call: F,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>> + Send,
{
    tokio::time::timeout(after, call)
        .await
        .map_err(|_| TransportError::Timeout { operation, after })?
}
