// ABOUTME: Service binary - runs the ingestion pipeline until interrupted
// ABOUTME: Selects storage, optionally simulates a heart-rate strap, and shuts down on Ctrl-C
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Wearable Ingest Binary
//!
//! Without a platform BLE backend the binary drives the simulated transport.
//! `--simulate` places a heart-rate strap in range and feeds it a synthetic
//! pulse so the whole pipeline can be observed end to end.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dashmap::DashSet;
use tracing::{info, warn};
use wearable_ingest::config::{DatabaseUrl, IngestConfig};
use wearable_ingest::constants::ble;
use wearable_ingest::logging;
use wearable_ingest::models::{DeviceType, DiscoveredDevice, UserId};
use wearable_ingest::scanner::ScanCallback;
use wearable_ingest::service::IngestService;
use wearable_ingest::storage::{InMemoryStorage, StorageGateway};
use wearable_ingest::transport::{SimulatedDevice, SimulatedTransport};

const SIMULATED_STRAP_ADDRESS: &str = "C0:FF:EE:00:00:01";

#[derive(Parser)]
#[command(name = "wearable-ingest")]
#[command(about = "Wearable device ingestion - BLE discovery, buffering and daily aggregation")]
struct Args {
    /// Override `DATABASE_URL`
    #[arg(long)]
    database_url: Option<String>,

    /// Keep everything in memory instead of SQLite
    #[arg(long)]
    memory_storage: bool,

    /// Put a simulated heart-rate strap in range
    #[arg(long)]
    simulate: bool,

    /// Do not run the continuous scan loop
    #[arg(long)]
    no_scan: bool,

    /// User that discovered heart-rate monitors are attached to
    #[arg(long, default_value_t = 1)]
    user_id: UserId,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = IngestConfig::from_env()?;
    if let Some(url) = &args.database_url {
        config.database = DatabaseUrl::parse_url(url)?;
    }

    let storage = open_storage(&config, args.memory_storage).await?;

    let transport = SimulatedTransport::new().blocking_for_window();
    if args.simulate {
        transport
            .add_device(SimulatedDevice::heart_rate_strap(
                SIMULATED_STRAP_ADDRESS,
                "Polar H10 Sim",
            ))
            .await;
        tokio::spawn(simulate_pulse(transport.clone()));
        info!(device = SIMULATED_STRAP_ADDRESS, "Simulated heart-rate strap in range");
    } else {
        warn!("No platform BLE backend available; discovery will find nothing without --simulate");
    }

    let service = Arc::new(IngestService::new(config, Arc::new(transport), storage).await);
    let on_results = auto_attach(&service, args.user_id);
    service.start(!args.no_scan, Some(on_results)).await;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Interrupt received");

    service.shutdown().await;
    let stats = service.collector().stats();
    info!(
        total_collected = stats.total_collected,
        rejected = stats.rejected,
        errors = stats.errors,
        "Final collection statistics"
    );
    Ok(())
}

#[cfg(feature = "sqlite")]
async fn open_storage(config: &IngestConfig, in_memory: bool) -> Result<Arc<dyn StorageGateway>> {
    if in_memory {
        return Ok(Arc::new(InMemoryStorage::new()));
    }
    if let DatabaseUrl::SQLite { path } = &config.database {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let storage =
        wearable_ingest::storage::SqliteStorage::new(&config.database.to_connection_string())
            .await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "sqlite"))]
async fn open_storage(config: &IngestConfig, in_memory: bool) -> Result<Arc<dyn StorageGateway>> {
    if !in_memory {
        warn!(database = %config.database, "Built without SQLite support, using in-memory storage");
    }
    Ok(Arc::new(InMemoryStorage::new()))
}

/// Scan callback that attaches newly seen heart-rate monitors to `user_id`
fn auto_attach(service: &Arc<IngestService>, user_id: UserId) -> ScanCallback {
    let attached: Arc<DashSet<String>> = Arc::new(DashSet::new());
    let service = Arc::downgrade(service);

    Arc::new(move |found: &[DiscoveredDevice]| {
        let candidates = found.iter().filter(|d| {
            d.device_type == DeviceType::HeartRateMonitor
                || d.services.iter().any(|s| s == ble::HEART_RATE_SERVICE)
        });
        for device in candidates {
            if !attached.insert(device.address.clone()) {
                continue;
            }
            let Some(service) = service.upgrade() else {
                return;
            };
            let attached = Arc::clone(&attached);
            let address = device.address.clone();
            let device_type = device.device_type;
            tokio::spawn(async move {
                if !service.attach_device(&address, user_id, device_type).await {
                    attached.remove(&address);
                }
            });
        }
    })
}

/// Push a slowly drifting pulse to the simulated strap once per second
async fn simulate_pulse(transport: SimulatedTransport) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut tick: u16 = 0;
    loop {
        ticker.tick().await;
        tick = tick.wrapping_add(1);
        let bpm = 64 + (tick % 24);
        let payload = if bpm > 80 {
            let [low, high] = bpm.to_le_bytes();
            vec![ble::HR_FLAG_VALUE_U16, low, high]
        } else {
            vec![0x00, bpm as u8]
        };
        transport
            .notify(SIMULATED_STRAP_ADDRESS, ble::HEART_RATE_MEASUREMENT, &payload)
            .await;
    }
}
