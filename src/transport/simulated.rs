// ABOUTME: Simulated in-process BLE transport with scripted devices and injectable failures
// ABOUTME: Drives scanner tests and the demo binary without Bluetooth hardware
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use wearable_core::constants::ble;
use wearable_core::constants::pipeline::NOTIFICATION_QUEUE_DEPTH;
use wearable_core::errors::TransportError;
use wearable_core::models::{DeviceAdvertisement, GattCharacteristic, GattService};

use super::{Connection, DeviceTransport};

/// Scripted device exposed by a [`SimulatedTransport`]
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    advertisement: DeviceAdvertisement,
    services: Vec<GattService>,
    values: HashMap<String, Vec<u8>>,
    refuse_connections: bool,
}

impl SimulatedDevice {
    /// Device advertising `name` (or nothing) at `address`
    #[must_use]
    pub fn new(address: &str, name: Option<&str>) -> Self {
        Self {
            advertisement: DeviceAdvertisement {
                name: name.map(str::to_owned),
                address: address.to_owned(),
                rssi: Some(-60),
            },
            services: Vec::new(),
            values: HashMap::new(),
            refuse_connections: false,
        }
    }

    /// Chest strap exposing the heart-rate service plus name and manufacturer reads
    #[must_use]
    pub fn heart_rate_strap(address: &str, name: &str) -> Self {
        Self::new(address, Some(name))
            .with_service(GattService {
                uuid: ble::HEART_RATE_SERVICE.to_owned(),
                description: Some("Heart Rate".to_owned()),
                characteristics: vec![
                    GattCharacteristic {
                        uuid: ble::HEART_RATE_MEASUREMENT.to_owned(),
                        properties: vec!["notify".to_owned()],
                        descriptors: vec!["00002902-0000-1000-8000-00805f9b34fb".to_owned()],
                    },
                    GattCharacteristic {
                        uuid: ble::BODY_SENSOR_LOCATION.to_owned(),
                        properties: vec!["read".to_owned()],
                        descriptors: Vec::new(),
                    },
                ],
            })
            .with_value(ble::DEVICE_NAME, name.as_bytes())
            .with_value(ble::MANUFACTURER_NAME, b"Simulated Sensors")
    }

    /// Set the advertised signal strength
    #[must_use]
    pub const fn with_rssi(mut self, rssi: i16) -> Self {
        self.advertisement.rssi = Some(rssi);
        self
    }

    /// Expose a GATT service
    #[must_use]
    pub fn with_service(mut self, service: GattService) -> Self {
        self.services.push(service);
        self
    }

    /// Answer reads of `uuid` with `value`
    #[must_use]
    pub fn with_value(mut self, uuid: &str, value: &[u8]) -> Self {
        self.values.insert(uuid.to_owned(), value.to_vec());
        self
    }

    /// Advertise but refuse every connection attempt
    #[must_use]
    pub const fn refusing_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    /// Advertised address
    #[must_use]
    pub fn address(&self) -> &str {
        &self.advertisement.address
    }
}

type SubscriberKey = (String, String);

#[derive(Default)]
struct SimulatedState {
    devices: RwLock<HashMap<String, SimulatedDevice>>,
    subscribers: RwLock<HashMap<SubscriberKey, Vec<mpsc::Sender<Vec<u8>>>>>,
    failing_disconnects: RwLock<HashSet<String>>,
    failing_service_lists: RwLock<HashSet<String>>,
    discovery_failure: RwLock<Option<String>>,
    blocks_for_window: AtomicBool,
    discover_calls: AtomicUsize,
    open_connections: AtomicUsize,
}

/// In-process [`DeviceTransport`]
///
/// Clones share state, so a test can keep one handle to push notifications
/// while the scanner owns another.
#[derive(Clone, Default)]
pub struct SimulatedTransport {
    state: Arc<SimulatedState>,
}

impl SimulatedTransport {
    /// Empty transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `discover` sleep for the whole requested window like a radio scan
    #[must_use]
    pub fn blocking_for_window(self) -> Self {
        self.state.blocks_for_window.store(true, Ordering::SeqCst);
        self
    }

    /// Add or replace a device
    pub async fn add_device(&self, device: SimulatedDevice) {
        self.state
            .devices
            .write()
            .await
            .insert(device.address().to_owned(), device);
    }

    /// Take a device out of range
    pub async fn remove_device(&self, address: &str) {
        self.state.devices.write().await.remove(address);
    }

    /// Make discovery fail with `reason` (or succeed again with `None`)
    pub async fn set_discovery_failure(&self, reason: Option<&str>) {
        *self.state.discovery_failure.write().await = reason.map(str::to_owned);
    }

    /// Make disconnects from `address` report a failure
    pub async fn fail_disconnects(&self, address: &str) {
        self.state
            .failing_disconnects
            .write()
            .await
            .insert(address.to_owned());
    }

    /// Make service listing on links to `address` fail
    pub async fn fail_service_listing(&self, address: &str) {
        self.state
            .failing_service_lists
            .write()
            .await
            .insert(address.to_owned());
    }

    /// Push a notification payload to every subscriber of (`address`, `uuid`)
    ///
    /// Returns how many subscribers accepted it.
    pub async fn notify(&self, address: &str, uuid: &str, payload: &[u8]) -> usize {
        let key = (address.to_owned(), uuid.to_owned());
        let mut subscribers = self.state.subscribers.write().await;
        let Some(senders) = subscribers.get_mut(&key) else {
            return 0;
        };
        senders.retain(|tx| !tx.is_closed());
        senders
            .iter()
            .filter(|tx| tx.try_send(payload.to_vec()).is_ok())
            .count()
    }

    /// Number of `discover` calls so far
    #[must_use]
    pub fn discover_calls(&self) -> usize {
        self.state.discover_calls.load(Ordering::SeqCst)
    }

    /// Connections currently open
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.state.open_connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceTransport for SimulatedTransport {
    async fn discover(&self, window: Duration) -> Result<Vec<DeviceAdvertisement>, TransportError> {
        self.state.discover_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.state.discovery_failure.read().await.clone() {
            return Err(TransportError::Discovery { reason });
        }
        if self.state.blocks_for_window.load(Ordering::SeqCst) {
            tokio::time::sleep(window).await;
        }

        let devices = self.state.devices.read().await;
        let mut seen: Vec<DeviceAdvertisement> =
            devices.values().map(|d| d.advertisement.clone()).collect();
        seen.sort_by(|a, b| a.address.cmp(&b.address));
        debug!(count = seen.len(), "Simulated discovery finished");
        Ok(seen)
    }

    async fn connect(&self, address: &str) -> Result<Box<dyn Connection>, TransportError> {
        let devices = self.state.devices.read().await;
        let device = devices.get(address).ok_or_else(|| TransportError::NotFound {
            address: address.to_owned(),
        })?;
        if device.refuse_connections {
            return Err(TransportError::ConnectFailed {
                address: address.to_owned(),
                reason: "connection refused by device".to_owned(),
            });
        }
        drop(devices);

        self.state.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimulatedConnection {
            address: address.to_owned(),
            state: Arc::clone(&self.state),
            connected: AtomicBool::new(true),
        }))
    }
}

struct SimulatedConnection {
    address: String,
    state: Arc<SimulatedState>,
    connected: AtomicBool,
}

impl SimulatedConnection {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::NotConnected {
                address: self.address.clone(),
            })
        }
    }

    async fn device(&self) -> Result<SimulatedDevice, TransportError> {
        self.state
            .devices
            .read()
            .await
            .get(&self.address)
            .cloned()
            .ok_or_else(|| TransportError::NotFound {
                address: self.address.clone(),
            })
    }

    fn unavailable(&self, uuid: &str) -> TransportError {
        TransportError::CharacteristicUnavailable {
            address: self.address.clone(),
            uuid: uuid.to_owned(),
        }
    }
}

#[async_trait]
impl Connection for SimulatedConnection {
    fn address(&self) -> &str {
        &self.address
    }

    async fn list_services(&self) -> Result<Vec<GattService>, TransportError> {
        self.ensure_connected()?;
        if self
            .state
            .failing_service_lists
            .read()
            .await
            .contains(&self.address)
        {
            return Err(TransportError::ServiceDiscovery {
                address: self.address.clone(),
                reason: "GATT table read timed out".to_owned(),
            });
        }
        Ok(self.device().await?.services)
    }

    async fn read_characteristic(&self, uuid: &str) -> Result<Vec<u8>, TransportError> {
        self.ensure_connected()?;
        self.device()
            .await?
            .values
            .get(uuid)
            .cloned()
            .ok_or_else(|| self.unavailable(uuid))
    }

    async fn subscribe(&self, uuid: &str) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
        self.ensure_connected()?;
        let device = self.device().await?;
        let exposed = device
            .services
            .iter()
            .flat_map(|s| &s.characteristics)
            .any(|c| c.uuid == uuid);
        if !exposed {
            return Err(self.unavailable(uuid));
        }

        let (tx, rx) = mpsc::channel(NOTIFICATION_QUEUE_DEPTH);
        self.state
            .subscribers
            .write()
            .await
            .entry((self.address.clone(), uuid.to_owned()))
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.state.open_connections.fetch_sub(1, Ordering::SeqCst);
        }
        self.state
            .subscribers
            .write()
            .await
            .retain(|(address, _), _| address != &self.address);

        if self
            .state
            .failing_disconnects
            .read()
            .await
            .contains(&self.address)
        {
            return Err(TransportError::DisconnectFailed {
                address: self.address.clone(),
                reason: "link supervision timeout".to_owned(),
            });
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
