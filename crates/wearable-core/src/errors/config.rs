// ABOUTME: Configuration error types for environment-based settings
// ABOUTME: Raised when a variable is present but cannot be used

/// Errors raised while loading configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Variable is set but its value is unusable
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// Raw value
        value: String,
        /// Why it was refused
        reason: &'static str,
    },
}
