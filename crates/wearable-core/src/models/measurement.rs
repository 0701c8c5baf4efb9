// ABOUTME: Validated measurement type key used to name buffers and stats counters
// ABOUTME: Normalizes case and refuses keys that would let the buffer map grow unbounded

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::measurements::{HEART_RATE, MAX_MEASUREMENT_TYPE_LEN, UNKNOWN};
use crate::errors::IngestError;

/// Measurement type key (`heart_rate`, `steps`, `sleep_duration`, ...)
///
/// The set is open, but keys are normalized to lowercase and restricted to
/// ASCII letters, digits, `_`, `-` and `.` so that arbitrary device payloads
/// cannot mint unbounded buffer names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeasurementType(String);

impl MeasurementType {
    /// Validate and normalize a key
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidMeasurementType` for empty, overlong or
    /// non-ASCII-identifier keys
    pub fn parse(raw: &str) -> Result<Self, IngestError> {
        let normalized = raw.trim().to_ascii_lowercase();
        let invalid = |reason| IngestError::InvalidMeasurementType {
            value: raw.to_owned(),
            reason,
        };

        if normalized.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if normalized.len() > MAX_MEASUREMENT_TYPE_LEN {
            return Err(invalid("longer than 64 characters"));
        }
        if !normalized
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'-' | b'.'))
        {
            return Err(invalid(
                "only letters, digits, '_', '-' and '.' are allowed",
            ));
        }

        Ok(Self(normalized))
    }

    /// The `heart_rate` key
    #[must_use]
    pub fn heart_rate() -> Self {
        Self(HEART_RATE.to_owned())
    }

    /// The `unknown` key used when an event omits its type
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN.to_owned())
    }

    /// Key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether points of this type are stored as individual heart-rate samples
    #[must_use]
    pub fn is_heart_rate(&self) -> bool {
        self.0 == HEART_RATE
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MeasurementType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MeasurementType {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MeasurementType> for String {
    fn from(value: MeasurementType) -> Self {
        value.0
    }
}
