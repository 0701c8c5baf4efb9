// ABOUTME: Service runtime wiring the collector, scanner and background processor together
// ABOUTME: Owns start and shutdown ordering for the background loops and device links
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Ingest Service
//!
//! The service is the composition root. The scanner's data sink is the
//! collector; the processor drains the collector into the storage gateway.

use std::sync::Arc;

use tracing::{info, warn};
use wearable_core::models::{DeviceType, UserId};

use crate::collector::{DataCollector, DataSink, RangeValidator};
use crate::config::IngestConfig;
use crate::processor::BackgroundProcessor;
use crate::scanner::{DeviceScanner, ScanCallback};
use crate::storage::StorageGateway;
use crate::transport::DeviceTransport;

/// Running ingestion pipeline
pub struct IngestService {
    config: IngestConfig,
    collector: Arc<DataCollector>,
    scanner: Arc<DeviceScanner>,
    processor: Arc<BackgroundProcessor>,
}

impl IngestService {
    /// Wire the pipeline; nothing runs until [`IngestService::start`]
    pub async fn new(
        config: IngestConfig,
        transport: Arc<dyn DeviceTransport>,
        storage: Arc<dyn StorageGateway>,
    ) -> Self {
        let collector = Arc::new(
            DataCollector::new(config.collector())
                .with_validator(Arc::new(RangeValidator::default())),
        );
        let scanner = Arc::new(DeviceScanner::new(transport, config.scanner()));
        let sink: Arc<dyn DataSink> = collector.clone();
        scanner.set_data_sink(sink).await;
        let processor = Arc::new(BackgroundProcessor::new(
            collector.clone(),
            storage,
            config.processor(),
        ));

        Self {
            config,
            collector,
            scanner,
            processor,
        }
    }

    /// Start the processor and, when `scan` is set, the continuous scan loop
    pub async fn start(&self, scan: bool, on_scan_results: Option<ScanCallback>) {
        self.processor.start().await;
        if scan {
            self.scanner.start_continuous_scan(on_scan_results).await;
        }
        info!(scan, "Ingest service started");
    }

    /// Register a device for `user_id`, connect to it and start monitoring
    ///
    /// Returns `false` if the connection or the subscription fails. Only what
    /// this call set up is undone then: a registration it replaced is
    /// restored and a link that was already open stays open.
    pub async fn attach_device(
        &self,
        address: &str,
        user_id: UserId,
        device_type: DeviceType,
    ) -> bool {
        let previous_record = self.collector.connection_record(address).await;
        let was_connected = self.scanner.is_connected(address).await;

        self.collector
            .register_device(address, user_id, device_type)
            .await;

        let linked = was_connected || self.scanner.connect(address).await;
        if linked && self.scanner.start_monitoring(address).await {
            info!(device = %address, user_id, "Device attached");
            return true;
        }

        warn!(device = %address, "Device could not be attached");
        if linked && !was_connected {
            self.scanner.disconnect(address).await;
        }
        match previous_record {
            Some(record) => self.collector.reinstate_device(address, record).await,
            None => {
                self.collector.unregister_device(address).await;
            }
        }
        false
    }

    /// Stop both loops, run a final cycle, and close every device link
    pub async fn shutdown(&self) {
        info!("Ingest service shutting down");
        self.scanner.stop_continuous_scan().await;
        self.scanner.disconnect_all().await;
        self.processor.stop().await;

        if let Err(e) = self.processor.run_cycle().await {
            warn!(error = %e, "Final processing cycle failed");
        }
        info!("Ingest service stopped");
    }

    /// Loaded configuration
    #[must_use]
    pub const fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingestion front door
    #[must_use]
    pub const fn collector(&self) -> &Arc<DataCollector> {
        &self.collector
    }

    /// Device scanner
    #[must_use]
    pub const fn scanner(&self) -> &Arc<DeviceScanner> {
        &self.scanner
    }

    /// Background processor
    #[must_use]
    pub const fn processor(&self) -> &Arc<BackgroundProcessor> {
        &self.processor
    }
}
