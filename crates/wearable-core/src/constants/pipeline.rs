// ABOUTME: Default capacities, periods and timeouts for the ingestion pipeline
// ABOUTME: Buffer sizes, loop periods, backoffs, transport timeouts and the default database URL
//
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Default per measurement-type buffer capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 1_000;

/// Default cap on distinct measurement-type buffers
pub const DEFAULT_MAX_MEASUREMENT_TYPES: usize = 64;

/// Default event bus capacity (slow subscribers lag past this)
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Processor period between cycles
pub const DEFAULT_PROCESS_INTERVAL_SECS: u64 = 30;

/// Processor rest after a failed cycle
pub const DEFAULT_PROCESS_ERROR_BACKOFF_SECS: u64 = 60;

/// Discovery window for one continuous scan pass
pub const DEFAULT_SCAN_DURATION_SECS: u64 = 10;

/// Rest between continuous scan passes
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 30;

/// Rest after a failed scan pass
pub const DEFAULT_SCAN_ERROR_BACKOFF_SECS: u64 = 60;

/// Bounded join timeout when stopping a background loop
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 5;

/// Per-call transport timeout
pub const DEFAULT_TRANSPORT_TIMEOUT_SECS: u64 = 15;

/// Per-call storage timeout
pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 10;

/// Notification queue depth per subscribed characteristic
pub const NOTIFICATION_QUEUE_DEPTH: usize = 64;

/// Default database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/wearable.db";
