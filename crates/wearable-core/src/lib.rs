// ABOUTME: Core types and constants for the wearable ingestion pipeline
// ABOUTME: Foundation crate with the data model, error taxonomy and BLE constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Wearable Core
//!
//! Foundation crate shared by the scanner, collector, processor and storage
//! adapters. It changes infrequently, which keeps incremental builds of the
//! main crate cheap.
//!
//! ## Modules
//!
//! - **models**: devices, health data points, daily aggregate rows and summaries
//! - **errors**: one `thiserror` enum per failure concern
//! - **constants**: GATT UUIDs, measurement type names, environment keys

/// Error taxonomy for ingestion, transport, storage and configuration
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Data model shared across the pipeline
pub mod models;
