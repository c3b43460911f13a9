//! Configuration for the settings runtime

use crate::error::{Result, SettingsError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the JSON settings file
pub const ENV_SETTINGS_FILE: &str = "WARDEN_SETTINGS_FILE";
/// Environment variable bounding store fetches, in milliseconds (0 disables)
pub const ENV_FETCH_TIMEOUT_MS: &str = "WARDEN_FETCH_TIMEOUT_MS";
/// Environment variable sizing the write event backlog
pub const ENV_EVENT_CAPACITY: &str = "WARDEN_EVENT_CAPACITY";

/// Where the settings record lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process only; lost on exit
    Memory,
    /// A JSON file at the given path
    File(PathBuf),
}

/// Configuration for [`SettingsRuntime`](crate::SettingsRuntime)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Backing medium for the settings record
    pub backend: BackendKind,

    /// Upper bound on a single store fetch; `None` waits indefinitely
    pub fetch_timeout: Option<Duration>,

    /// Broadcast backlog for write observers
    pub event_capacity: usize,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            fetch_timeout: Some(Duration::from_secs(5)),
            event_capacity: 64,
        }
    }
}

impl SettingsConfig {
    pub fn builder() -> SettingsConfigBuilder {
        SettingsConfigBuilder::default()
    }

    /// Defaults with an in-memory record
    pub fn memory() -> Self {
        Self::default()
    }

    /// Defaults with the record stored at `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::File(path.into()),
            ..Default::default()
        }
    }

    /// Read configuration from the environment, loading `.env` first if present.
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut builder = Self::builder();

        if let Ok(path) = std::env::var(ENV_SETTINGS_FILE) {
            if !path.trim().is_empty() {
                builder = builder.backend(BackendKind::File(PathBuf::from(path)));
            }
        }

        if let Ok(raw) = std::env::var(ENV_FETCH_TIMEOUT_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                SettingsError::ConfigError(format!("{} must be an integer, got {:?}", ENV_FETCH_TIMEOUT_MS, raw))
            })?;
            builder = if ms == 0 {
                builder.no_fetch_timeout()
            } else {
                builder.fetch_timeout(Duration::from_millis(ms))
            };
        }

        if let Ok(raw) = std::env::var(ENV_EVENT_CAPACITY) {
            let capacity: usize = raw.trim().parse().map_err(|_| {
                SettingsError::ConfigError(format!("{} must be an integer, got {:?}", ENV_EVENT_CAPACITY, raw))
            })?;
            builder = builder.event_capacity(capacity);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(SettingsError::ConfigError(
                "event_capacity must be greater than 0".to_string(),
            ));
        }

        if self.fetch_timeout == Some(Duration::ZERO) {
            return Err(SettingsError::ConfigError(
                "fetch_timeout must be greater than 0; use None to disable it".to_string(),
            ));
        }

        if let BackendKind::File(path) = &self.backend {
            if path.as_os_str().is_empty() {
                return Err(SettingsError::ConfigError(
                    "settings file path must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Builder for [`SettingsConfig`]
#[derive(Debug, Default)]
pub struct SettingsConfigBuilder {
    backend: Option<BackendKind>,
    fetch_timeout: Option<Option<Duration>>,
    event_capacity: Option<usize>,
}

impl SettingsConfigBuilder {
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(Some(timeout));
        self
    }

    pub fn no_fetch_timeout(mut self) -> Self {
        self.fetch_timeout = Some(None);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> SettingsConfig {
        let defaults = SettingsConfig::default();

        SettingsConfig {
            backend: self.backend.unwrap_or(defaults.backend),
            fetch_timeout: self.fetch_timeout.unwrap_or(defaults.fetch_timeout),
            event_capacity: self.event_capacity.unwrap_or(defaults.event_capacity),
        }
    }
}
