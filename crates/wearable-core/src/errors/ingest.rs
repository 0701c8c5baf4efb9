// ABOUTME: Ingestion error types for the data collector
// ABOUTME: Distinguishes dropped, rejected and malformed points plus observer failures

/// Reasons a point was not buffered by the collector
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// Event came from an address missing from the device registry
    #[error("Unknown device: {}", .address.as_deref().unwrap_or("<missing>"))]
    UnknownDevice {
        /// Address carried by the event, if any
        address: Option<String>,
    },

    /// The configured validator declined the point
    #[error("Validation rejected {measurement_type} point: {reason}")]
    ValidationRejected {
        /// Measurement type of the rejected point
        measurement_type: String,
        /// Validator's explanation
        reason: String,
    },

    /// Timestamp string could not be interpreted as an absolute time
    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp {
        /// Offending timestamp text
        value: String,
    },

    /// Measurement type key failed validation
    #[error("Invalid measurement type '{value}': {reason}")]
    InvalidMeasurementType {
        /// Offending key
        value: String,
        /// Rule that was violated
        reason: &'static str,
    },

    /// A new buffer would exceed the distinct-type cap
    #[error("Measurement type '{measurement_type}' refused: buffer limit of {limit} types reached")]
    TooManyMeasurementTypes {
        /// Type that would have created a new buffer
        measurement_type: String,
        /// Configured cap
        limit: usize,
    },
}

impl IngestError {
    /// Whether the failure is the device-registry drop path
    #[must_use]
    pub const fn is_unknown_device(&self) -> bool {
        matches!(self, Self::UnknownDevice { .. })
    }

    /// Whether the failure is a validator rejection
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::ValidationRejected { .. })
    }
}

/// Failure raised by a fan-out observer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    /// Observer returned an error
    #[error("Observer failed: {message}")]
    Failed {
        /// Observer's error text
        message: String,
    },

    /// Observer panicked while handling the point
    #[error("Observer panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text
        message: String,
    },
}

impl ObserverError {
    /// Build a failure from any displayable message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
