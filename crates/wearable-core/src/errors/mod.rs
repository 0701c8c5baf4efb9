// ABOUTME: Error taxonomy for the wearable ingestion pipeline
// ABOUTME: One thiserror enum per failure concern, re-exported at module level
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Error Types
//!
//! Every failure the pipeline can surface is one of these enums. None of them
//! is fatal to a background loop: the scan and processing loops log them and
//! back off.

/// Configuration loading errors
pub mod config;
/// Ingestion path errors (unknown device, rejected point, bad keys)
pub mod ingest;
/// Persistence errors raised by storage gateways
pub mod storage;
/// BLE transport errors (discover, connect, read, subscribe, disconnect)
pub mod transport;

pub use config::ConfigError;
pub use ingest::{IngestError, ObserverError};
pub use storage::StorageError;
pub use transport::TransportError;
