// ABOUTME: Environment configuration for the ingestion service
// ABOUTME: Reads capacities, loop timings and the database URL with validated defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-based configuration

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use wearable_core::constants::{env_config, pipeline};
use wearable_core::errors::ConfigError;

use super::{CollectorConfig, ProcessorConfig, ScannerConfig};

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database file
    SQLite {
        /// File path
        path: PathBuf,
    },
    /// In-memory SQLite database
    Memory,
}

impl DatabaseUrl {
    /// Parse a `sqlite:` URL or a bare file path
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for any other URL scheme
    pub fn parse_url(s: &str) -> Result<Self, ConfigError> {
        if let Some(path) = s.strip_prefix("sqlite:") {
            let path = path.trim_start_matches("//");
            if path == ":memory:" {
                return Ok(Self::Memory);
            }
            return Ok(Self::SQLite {
                path: PathBuf::from(path),
            });
        }
        if s.contains("://") {
            return Err(ConfigError::Invalid {
                key: env_config::DATABASE_URL,
                value: s.to_owned(),
                reason: "only sqlite databases are supported",
            });
        }
        Ok(Self::SQLite {
            path: PathBuf::from(s),
        })
    }

    /// Connection string understood by `sqlx`
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::parse_url(pipeline::DEFAULT_DATABASE_URL).unwrap_or(Self::Memory)
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_connection_string())
    }
}

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Storage location
    pub database: DatabaseUrl,
    /// Per measurement-type buffer capacity
    pub buffer_capacity: usize,
    /// Cap on distinct measurement-type buffers
    pub max_measurement_types: usize,
    /// Event bus capacity
    pub event_channel_capacity: usize,
    /// Processor period
    pub process_interval: Duration,
    /// Processor rest after a failed cycle
    pub process_error_backoff: Duration,
    /// Discovery window of one continuous scan pass
    pub scan_duration: Duration,
    /// Rest between scan passes
    pub scan_interval: Duration,
    /// Rest after a failed scan pass
    pub scan_error_backoff: Duration,
    /// Bounded join timeout for background loops
    pub stop_timeout: Duration,
    /// Per-call transport timeout
    pub transport_timeout: Duration,
    /// Per-call storage timeout
    pub storage_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database: DatabaseUrl::default(),
            buffer_capacity: pipeline::DEFAULT_BUFFER_CAPACITY,
            max_measurement_types: pipeline::DEFAULT_MAX_MEASUREMENT_TYPES,
            event_channel_capacity: pipeline::DEFAULT_EVENT_CHANNEL_CAPACITY,
            process_interval: Duration::from_secs(pipeline::DEFAULT_PROCESS_INTERVAL_SECS),
            process_error_backoff: Duration::from_secs(
                pipeline::DEFAULT_PROCESS_ERROR_BACKOFF_SECS,
            ),
            scan_duration: Duration::from_secs(pipeline::DEFAULT_SCAN_DURATION_SECS),
            scan_interval: Duration::from_secs(pipeline::DEFAULT_SCAN_INTERVAL_SECS),
            scan_error_backoff: Duration::from_secs(pipeline::DEFAULT_SCAN_ERROR_BACKOFF_SECS),
            stop_timeout: Duration::from_secs(pipeline::DEFAULT_STOP_TIMEOUT_SECS),
            transport_timeout: Duration::from_secs(pipeline::DEFAULT_TRANSPORT_TIMEOUT_SECS),
            storage_timeout: Duration::from_secs(pipeline::DEFAULT_STORAGE_TIMEOUT_SECS),
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a variable is set to something
    /// unparseable or to zero
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment variables");

        let database = match env::var(env_config::DATABASE_URL) {
            Ok(url) => DatabaseUrl::parse_url(&url)?,
            Err(_) => DatabaseUrl::default(),
        };

        let config = Self {
            database,
            buffer_capacity: env_positive(
                env_config::BUFFER_CAPACITY,
                pipeline::DEFAULT_BUFFER_CAPACITY,
            )?,
            max_measurement_types: env_positive(
                env_config::MAX_MEASUREMENT_TYPES,
                pipeline::DEFAULT_MAX_MEASUREMENT_TYPES,
            )?,
            event_channel_capacity: env_positive(
                env_config::EVENT_CHANNEL_CAPACITY,
                pipeline::DEFAULT_EVENT_CHANNEL_CAPACITY,
            )?,
            process_interval: env_secs(
                env_config::PROCESS_INTERVAL_SECS,
                pipeline::DEFAULT_PROCESS_INTERVAL_SECS,
            )?,
            process_error_backoff: env_secs(
                env_config::PROCESS_ERROR_BACKOFF_SECS,
                pipeline::DEFAULT_PROCESS_ERROR_BACKOFF_SECS,
            )?,
            scan_duration: env_secs(
                env_config::SCAN_DURATION_SECS,
                pipeline::DEFAULT_SCAN_DURATION_SECS,
            )?,
            scan_interval: env_secs(
                env_config::SCAN_INTERVAL_SECS,
                pipeline::DEFAULT_SCAN_INTERVAL_SECS,
            )?,
            scan_error_backoff: env_secs(
                env_config::SCAN_ERROR_BACKOFF_SECS,
                pipeline::DEFAULT_SCAN_ERROR_BACKOFF_SECS,
            )?,
            stop_timeout: env_secs(
                env_config::STOP_TIMEOUT_SECS,
                pipeline::DEFAULT_STOP_TIMEOUT_SECS,
            )?,
            transport_timeout: env_secs(
                env_config::TRANSPORT_TIMEOUT_SECS,
                pipeline::DEFAULT_TRANSPORT_TIMEOUT_SECS,
            )?,
            storage_timeout: env_secs(
                env_config::STORAGE_TIMEOUT_SECS,
                pipeline::DEFAULT_STORAGE_TIMEOUT_SECS,
            )?,
        };

        info!(
            database = %config.database,
            buffer_capacity = config.buffer_capacity,
            process_interval_secs = config.process_interval.as_secs(),
            scan_interval_secs = config.scan_interval.as_secs(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Settings for the data collector
    #[must_use]
    pub const fn collector(&self) -> CollectorConfig {
        CollectorConfig {
            buffer_capacity: self.buffer_capacity,
            max_measurement_types: self.max_measurement_types,
            event_channel_capacity: self.event_channel_capacity,
        }
    }

    /// Settings for the device scanner
    #[must_use]
    pub const fn scanner(&self) -> ScannerConfig {
        ScannerConfig {
            scan_duration: self.scan_duration,
            scan_interval: self.scan_interval,
            error_backoff: self.scan_error_backoff,
            stop_timeout: self.stop_timeout,
            transport_timeout: self.transport_timeout,
        }
    }

    /// Settings for the background processor
    #[must_use]
    pub const fn processor(&self) -> ProcessorConfig {
        ProcessorConfig {
            interval: self.process_interval,
            error_backoff: self.process_error_backoff,
            stop_timeout: self.stop_timeout,
            storage_timeout: self.storage_timeout,
        }
    }
}

/// Read a variable and parse it, falling back to `default` when unset
fn env_parse<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            reason: "not a non-negative integer",
        }),
        Err(_) => Ok(default),
    }
}

fn env_positive(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    let value = env_parse(key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero",
        });
    }
    Ok(value)
}

fn env_secs(key: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs = env_parse(key, default_secs)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: secs.to_string(),
            reason: "must be greater than zero",
        });
    }
    Ok(Duration::from_secs(secs))
}
