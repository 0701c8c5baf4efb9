// ABOUTME: Storage error types raised by storage gateway implementations
// ABOUTME: Logged by the processor loop, which then backs off; failed points are not retried

use std::time::Duration;

/// Errors raised while persisting or reading aggregate rows
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database driver error
    #[cfg(feature = "sqlx-errors")]
    #[error("Database error during {context}")]
    Database {
        /// Operation being performed
        context: &'static str,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// Storage call exceeded its deadline
    #[error("Storage {operation} timed out after {after:?}")]
    Timeout {
        /// Operation name
        operation: &'static str,
        /// Deadline that elapsed
        after: Duration,
    },

    /// Backend is not reachable
    #[error("Storage unavailable: {reason}")]
    Unavailable {
        /// Underlying reason
        reason: String,
    },

    /// Column payload could not be (de)serialized
    #[error("Serialization failed for {context}")]
    Serialization {
        /// Value being converted
        context: &'static str,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Stored value could not be interpreted
    #[error("Corrupt {entity} row: {reason}")]
    Corrupt {
        /// Entity being decoded
        entity: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

impl StorageError {
    /// Wrap a driver error with the operation it happened in
    #[cfg(feature = "sqlx-errors")]
    #[must_use]
    pub fn database(context: &'static str, source: sqlx::Error) -> Self {
        Self::Database { context, source }
    }
}
