// ABOUTME: Device scanner - discovery, classification, connections and heart-rate monitoring
// ABOUTME: Relays decoded notifications to the data sink and runs the continuous scan loop
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Device Scanner
//!
//! The scanner drives a [`DeviceTransport`]. Discovery keeps advertisements
//! whose name matches the health vocabulary, classifies them, and records
//! them in the device table. Connected devices keep their link and an info
//! snapshot; monitoring subscribes to heart-rate notifications and spawns one
//! task per subscription that decodes payloads and forwards raw events to the
//! configured [`DataSink`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wearable_core::constants::ble;
use wearable_core::constants::measurements::HEART_RATE;
use wearable_core::errors::TransportError;
use wearable_core::models::{
    ConnectionState, Device, DeviceInfo, DeviceType, DiscoveredDevice, RawEvent,
};

use crate::collector::DataSink;
use crate::config::ScannerConfig;
use crate::lifecycle::{LoopSchedule, StopOutcome, SupervisedLoop};
use crate::logging::PipelineLogger;
use crate::transport::{with_timeout, Connection, DeviceTransport};

/// Advertisement name heuristics
pub mod classify;
/// Heart Rate Measurement decoding
pub mod heart_rate;

pub use classify::{classify_device, is_health_device};
pub use heart_rate::decode_heart_rate;

/// Callback receiving the results of every continuous scan pass
pub type ScanCallback = Arc<dyn Fn(&[DiscoveredDevice]) + Send + Sync>;

type DeviceTable = Arc<RwLock<HashMap<String, Device>>>;
type SinkSlot = Arc<RwLock<Option<Arc<dyn DataSink>>>>;

/// Open link plus what was learned when it was opened
struct ConnectedDevice {
    link: Arc<dyn Connection>,
    info: DeviceInfo,
}

/// Snapshot row returned by [`DeviceScanner::get_connected_devices`]
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedDeviceSnapshot {
    /// Device address
    pub address: String,
    /// Info captured at connect time
    pub info: DeviceInfo,
    /// Whether the link still reports connected
    pub connected: bool,
}

/// BLE discovery and connection manager
pub struct DeviceScanner {
    transport: Arc<dyn DeviceTransport>,
    config: ScannerConfig,
    devices: DeviceTable,
    connections: RwLock<HashMap<String, ConnectedDevice>>,
    notification_tasks: RwLock<HashMap<String, Vec<JoinHandle<()>>>>,
    sink: SinkSlot,
    monitoring: AtomicBool,
    scan_loop: Mutex<Option<SupervisedLoop>>,
}

impl DeviceScanner {
    /// Scanner over `transport`
    #[must_use]
    pub fn new(transport: Arc<dyn DeviceTransport>, config: ScannerConfig) -> Self {
        Self {
            transport,
            config,
            devices: Arc::new(RwLock::new(HashMap::new())),
            connections: RwLock::new(HashMap::new()),
            notification_tasks: RwLock::new(HashMap::new()),
            sink: Arc::new(RwLock::new(None)),
            monitoring: AtomicBool::new(false),
            scan_loop: Mutex::new(None),
        }
    }

    /// Route decoded notifications to `sink` (replaces any previous sink)
    pub async fn set_data_sink(&self, sink: Arc<dyn DataSink>) {
        *self.sink.write().await = Some(sink);
    }

    /// Discover health devices for `window`
    ///
    /// Each included device gets a best-effort transient connection to list
    /// its services; a failed inspection leaves the service list empty.
    ///
    /// # Errors
    ///
    /// Returns the transport's discovery error, or `Timeout` when discovery
    /// overruns `window` plus the transport timeout
    pub async fn discover(&self, window: Duration) -> Result<Vec<DiscoveredDevice>, TransportError> {
        info!(window_secs = window.as_secs_f64(), "Scanning for health devices");
        let advertisements = with_timeout(
            "discover",
            window + self.config.transport_timeout,
            self.transport.discover(window),
        )
        .await?;

        let mut found = Vec::new();
        for advertisement in advertisements {
            let Some(name) = advertisement
                .name
                .clone()
                .filter(|n| is_health_device(n))
            else {
                continue;
            };

            let device_type = classify_device(Some(&name));
            let services = self.inspect_services(&advertisement.address).await;
            debug!(
                device = %advertisement.address,
                name = %name,
                device_type = %device_type,
                services = services.len(),
                "Health device discovered"
            );

            found.push(DiscoveredDevice {
                name,
                address: advertisement.address,
                rssi: advertisement.rssi,
                services,
                device_type,
                discovered_at: Utc::now(),
            });
        }

        let mut devices = self.devices.write().await;
        for candidate in &found {
            devices
                .entry(candidate.address.clone())
                .or_insert_with(|| Device {
                    address: candidate.address.clone(),
                    name: Some(candidate.name.clone()),
                    device_type: candidate.device_type,
                    services: candidate.services.clone(),
                    state: ConnectionState::Discovered,
                    last_activity: candidate.discovered_at,
                });
        }
        drop(devices);

        info!(count = found.len(), "Discovery finished");
        Ok(found)
    }

    /// Connect, list services and close again; empty on any failure
    async fn inspect_services(&self, address: &str) -> Vec<String> {
        let timeout = self.config.transport_timeout;
        let link = match with_timeout("connect", timeout, self.transport.connect(address)).await {
            Ok(link) => link,
            Err(e) => {
                debug!(device = %address, error = %e, "Service inspection could not connect");
                return Vec::new();
            }
        };

        let services = with_timeout("list_services", timeout, link.list_services())
            .await
            .map(|services| services.into_iter().map(|s| s.uuid).collect())
            .unwrap_or_else(|e| {
                debug!(device = %address, error = %e, "Service inspection could not list services");
                Vec::new()
            });

        if let Err(e) = with_timeout("disconnect", timeout, link.disconnect()).await {
            debug!(device = %address, error = %e, "Service inspection disconnect failed");
        }
        services
    }

    /// Open a connection and register the device with a fresh info snapshot
    ///
    /// Returns `false` (and registers nothing) only when the connection
    /// fails; a failed service listing leaves the snapshot without services.
    /// Reconnecting replaces the previous link.
    pub async fn connect(&self, address: &str) -> bool {
        let timeout = self.config.transport_timeout;
        let link: Arc<dyn Connection> =
            match with_timeout("connect", timeout, self.transport.connect(address)).await {
                Ok(link) => Arc::from(link),
                Err(e) => {
                    warn!(device = %address, error = %e, "Connection failed");
                    return false;
                }
            };

        let services = with_timeout("list_services", timeout, link.list_services())
            .await
            .unwrap_or_else(|e| {
                warn!(device = %address, error = %e, "Service discovery failed, keeping link");
                Vec::new()
            });

        let name = read_text(link.as_ref(), ble::DEVICE_NAME, timeout).await;
        let manufacturer = read_text(link.as_ref(), ble::MANUFACTURER_NAME, timeout).await;
        let info = DeviceInfo {
            address: address.to_owned(),
            name: name.clone(),
            manufacturer,
            connected_at: Utc::now(),
            services,
        };

        let service_uuids = info.service_uuids();
        let previous = self.connections.write().await.insert(
            address.to_owned(),
            ConnectedDevice {
                link: Arc::clone(&link),
                info,
            },
        );
        if let Some(previous) = previous {
            self.abort_notification_tasks(address).await;
            if !Arc::ptr_eq(&previous.link, &link) && previous.link.is_connected() {
                if let Err(e) = with_timeout("disconnect", timeout, previous.link.disconnect()).await {
                    debug!(device = %address, error = %e, "Closing replaced link failed");
                }
            }
        }

        let mut devices = self.devices.write().await;
        let device = devices.entry(address.to_owned()).or_insert_with(|| Device {
            address: address.to_owned(),
            name: name.clone(),
            device_type: classify_device(name.as_deref()),
            services: Vec::new(),
            state: ConnectionState::Connected,
            last_activity: Utc::now(),
        });
        device.services = service_uuids;
        device.state = ConnectionState::Connected;
        device.last_activity = Utc::now();
        if device.name.is_none() {
            device.name = name;
        }
        drop(devices);

        PipelineLogger::log_device_event(address, "connect");
        true
    }

    /// Subscribe to heart-rate notifications on a connected device
    ///
    /// Returns `false` when the device is not connected or the subscription
    /// fails. Devices without the heart-rate service are marked monitoring
    /// with nothing subscribed. A device whose relay is still running is not
    /// subscribed again.
    pub async fn start_monitoring(&self, address: &str) -> bool {
        let (link, has_heart_rate) = {
            let connections = self.connections.read().await;
            let Some(connected) = connections.get(address) else {
                warn!(device = %address, "Cannot monitor a device that is not connected");
                return false;
            };
            (
                Arc::clone(&connected.link),
                connected.info.has_service(ble::HEART_RATE_SERVICE),
            )
        };

        let already_relaying = self
            .notification_tasks
            .read()
            .await
            .get(address)
            .is_some_and(|tasks| tasks.iter().any(|task| !task.is_finished()));

        if already_relaying {
            debug!(device = %address, "Heart rate notifications already relayed");
        } else if has_heart_rate {
            let receiver = match with_timeout(
                "subscribe",
                self.config.transport_timeout,
                link.subscribe(ble::HEART_RATE_MEASUREMENT),
            )
            .await
            {
                Ok(receiver) => receiver,
                Err(e) => {
                    warn!(device = %address, error = %e, "Heart rate subscription failed");
                    return false;
                }
            };

            let task = tokio::spawn(relay_heart_rate(
                address.to_owned(),
                receiver,
                Arc::clone(&self.sink),
                Arc::clone(&self.devices),
            ));
            self.notification_tasks
                .write()
                .await
                .entry(address.to_owned())
                .or_default()
                .push(task);
        } else {
            debug!(device = %address, "No heart rate service, nothing to subscribe");
        }

        if let Some(device) = self.devices.write().await.get_mut(address) {
            device.state = ConnectionState::Monitoring;
            device.last_activity = Utc::now();
        }
        self.monitoring.store(true, Ordering::SeqCst);
        PipelineLogger::log_device_event(address, "monitor");
        true
    }

    /// Close a device's link and drop its bookkeeping
    ///
    /// A failing transport disconnect is logged; local state is removed
    /// regardless. Unknown addresses are a no-op.
    pub async fn disconnect(&self, address: &str) {
        let Some(connected) = self.connections.write().await.remove(address) else {
            warn!(device = %address, "Disconnect requested for unknown device");
            return;
        };
        self.abort_notification_tasks(address).await;

        if let Err(e) = with_timeout(
            "disconnect",
            self.config.transport_timeout,
            connected.link.disconnect(),
        )
        .await
        {
            warn!(device = %address, error = %e, "Transport disconnect failed");
        }

        if let Some(device) = self.devices.write().await.get_mut(address) {
            device.state = ConnectionState::Disconnected;
            device.last_activity = Utc::now();
        }
        PipelineLogger::log_device_event(address, "disconnect");
    }

    /// Disconnect every connected device and clear the monitoring flag
    pub async fn disconnect_all(&self) {
        let addresses: Vec<String> = self.connections.read().await.keys().cloned().collect();
        for address in addresses {
            self.disconnect(&address).await;
        }
        self.monitoring.store(false, Ordering::SeqCst);
    }

    async fn abort_notification_tasks(&self, address: &str) {
        if let Some(tasks) = self.notification_tasks.write().await.remove(address) {
            for task in tasks {
                task.abort();
            }
        }
    }

    /// Every connected device with its info snapshot
    pub async fn get_connected_devices(&self) -> Vec<ConnectedDeviceSnapshot> {
        let mut snapshot: Vec<_> = self
            .connections
            .read()
            .await
            .iter()
            .map(|(address, connected)| ConnectedDeviceSnapshot {
                address: address.clone(),
                info: connected.info.clone(),
                connected: connected.link.is_connected(),
            })
            .collect();
        snapshot.sort_by(|a, b| a.address.cmp(&b.address));
        snapshot
    }

    /// Whether `address` currently has an open link held by the scanner
    pub async fn is_connected(&self, address: &str) -> bool {
        self.connections.read().await.contains_key(address)
    }

    /// Every device the scanner knows about
    pub async fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<_> = self.devices.read().await.values().cloned().collect();
        devices.sort_by(|a, b| a.address.cmp(&b.address));
        devices
    }

    /// One tracked device
    pub async fn device(&self, address: &str) -> Option<Device> {
        self.devices.read().await.get(address).cloned()
    }

    /// Whether any device has been put into monitoring since the last `disconnect_all`
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    /// Start the continuous scan loop; returns `false` if it is already running
    ///
    /// Each pass discovers for the configured window, hands the results to
    /// `on_results`, then rests for the scan interval (or the error backoff
    /// after a failed or panicked pass).
    pub async fn start_continuous_scan(
        self: &Arc<Self>,
        on_results: Option<ScanCallback>,
    ) -> bool {
        let mut slot = self.scan_loop.lock().await;
        if slot.as_ref().is_some_and(|running| !running.is_finished()) {
            debug!("Continuous scan already running");
            return false;
        }

        let scanner: Weak<Self> = Arc::downgrade(self);
        let window = self.config.scan_duration;
        let schedule = LoopSchedule {
            period: self.config.scan_interval,
            error_backoff: self.config.error_backoff,
            cancel_in_flight: true,
        };

        *slot = Some(SupervisedLoop::spawn("device-scan", schedule, move || {
            let scanner = scanner.clone();
            let on_results = on_results.clone();
            async move {
                let Some(scanner) = scanner.upgrade() else {
                    return Ok(());
                };
                let found = scanner.discover(window).await?;
                if let Some(callback) = on_results {
                    callback(&found);
                }
                Ok::<(), TransportError>(())
            }
        }));
        info!("Continuous scan started");
        true
    }

    /// Stop the continuous scan loop, waiting at most the configured stop timeout
    pub async fn stop_continuous_scan(&self) {
        let running = self.scan_loop.lock().await.take();
        if let Some(running) = running {
            if running.stop(self.config.stop_timeout).await == StopOutcome::Aborted {
                warn!("Continuous scan aborted after stop timeout");
            }
            info!("Continuous scan stopped");
        }
    }

    /// Whether the continuous scan loop is running
    pub async fn is_scanning(&self) -> bool {
        self.scan_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.is_finished())
    }
}

/// Read a UTF-8 characteristic, `None` on any failure
async fn read_text(link: &dyn Connection, uuid: &str, timeout: Duration) -> Option<String> {
    match with_timeout("read_characteristic", timeout, link.read_characteristic(uuid)).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes)
                .trim_end_matches('\0')
                .trim()
                .to_owned();
            (!text.is_empty()).then_some(text)
        }
        Err(e) => {
            debug!(device = %link.address(), uuid = %uuid, error = %e, "Optional read failed");
            None
        }
    }
}

/// Decode heart-rate notifications until the link closes
async fn relay_heart_rate(
    address: String,
    mut receiver: mpsc::Receiver<Vec<u8>>,
    sink: SinkSlot,
    devices: DeviceTable,
) {
    while let Some(payload) = receiver.recv().await {
        let bpm = decode_heart_rate(&payload);
        let now = Utc::now();

        if let Some(device) = devices.write().await.get_mut(&address) {
            device.last_activity = now;
        }

        let event = RawEvent {
            device_address: Some(address.clone()),
            device_type: Some(DeviceType::HeartRateMonitor.as_str().to_owned()),
            measurement_type: Some(HEART_RATE.to_owned()),
            value: Some(f64::from(bpm)),
            timestamp: Some(now.to_rfc3339()),
            raw_data: Some(hex::encode(&payload)),
            metadata: None,
        };

        let sink = sink.read().await.clone();
        match sink {
            Some(sink) => sink.deliver(event).await,
            None => debug!(device = %address, bpm, "No data sink, dropping heart rate sample"),
        }
    }
    debug!(device = %address, "Heart rate notifications ended");
}
