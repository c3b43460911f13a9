//! Error types for settings operations
//!
//! The taxonomy separates "store not ready" failures, which readers absorb by
//! falling back to default settings, from failures that must reach the caller.

use thiserror::Error;

/// Main error type for settings operations
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Backing medium unreachable (I/O failure, outage, fetch timeout)
    #[error("Settings store unavailable: {0}")]
    StoreUnavailable(String),

    /// No settings record has been provisioned yet
    #[error("System settings record not found")]
    RecordNotFound,

    /// A write was rejected before reaching the store
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SettingsError {
    /// True for the failures that mean "the store cannot produce a record
    /// right now". Only these degrade to default settings on the read path.
    pub fn is_store_not_ready(&self) -> bool {
        matches!(
            self,
            SettingsError::StoreUnavailable(_) | SettingsError::RecordNotFound
        )
    }
}

/// Result type alias for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::SerializationError(e.to_string())
    }
}
