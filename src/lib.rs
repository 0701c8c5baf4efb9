// ABOUTME: Main library entry point for the wearable ingestion pipeline
// ABOUTME: BLE device discovery, buffered collection and periodic daily aggregation
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Wearable Ingest
//!
//! Ingests physiological and activity readings from wearable devices,
//! buffers them under concurrent producers, and periodically persists them
//! with per-user daily rollups.
//!
//! ## Architecture
//!
//! - **Transport**: narrow async traits over a BLE stack, plus a simulated stack
//! - **Scanner**: discovery, classification, connections and heart-rate monitoring
//! - **Collector**: validation, bounded per-type buffers, counters and fan-out
//! - **Processor**: periodic drain into the storage gateway with day-row merges
//! - **Storage**: gateway trait with SQLite and in-memory adapters
//!
//! Data flows transport → scanner → collector → buffers → processor → storage.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wearable_ingest::config::CollectorConfig;
//! use wearable_ingest::collector::DataCollector;
//! use wearable_ingest::models::DeviceType;
//!
//! # async fn demo() -> Result<(), wearable_ingest::errors::IngestError> {
//! let collector = Arc::new(DataCollector::new(CollectorConfig::default()));
//! collector.register_device("AA:BB:CC:DD:EE:FF", 7, DeviceType::HeartRateMonitor).await;
//! collector.collect_manual(7, "steps", 4200.0, None, None).await?;
//! # Ok(())
//! # }
//! ```

/// Data collector, buffers, counters, validation and fan-out
pub mod collector;

/// Environment configuration and per-component settings
pub mod config;

/// Supervised background loops
pub mod lifecycle;

/// Structured logging setup
pub mod logging;

/// Background drain-and-persist processor
pub mod processor;

/// Device discovery, connections and monitoring
pub mod scanner;

/// Service composition root
pub mod service;

/// Storage gateway and adapters
pub mod storage;

/// BLE transport abstraction and simulated transport
pub mod transport;

/// Shared constants (GATT UUIDs, measurement names, defaults)
pub use wearable_core::constants;
/// Domain error types
pub use wearable_core::errors;
/// Domain models
pub use wearable_core::models;
