//! The system settings record and partial updates to it

use crate::error::{Result, SettingsError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound accepted for `max_upload_mb` (10 GiB)
pub const MAX_UPLOAD_LIMIT_MB: u32 = 10 * 1024;

/// The singleton system settings record.
///
/// Once fetched, a value is treated as an immutable snapshot and shared
/// behind an `Arc`. Writes never mutate a snapshot in place; they produce a
/// new record with a bumped `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Maximum accepted upload size in megabytes
    pub max_upload_mb: u32,

    /// Whether findings are deduplicated on import
    pub enable_deduplication: bool,

    /// Whether the Jira integration is active
    pub enable_jira: bool,

    /// Whether product grading is computed
    pub enable_product_grade: bool,

    /// Whether users may edit their own profile
    pub enable_user_profile_editable: bool,

    /// Time zone used for rendering timestamps
    pub time_zone: String,

    /// Incremented by every committed write; 0 for the unprovisioned default
    #[serde(default)]
    pub version: u64,

    /// Time of the last committed write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            max_upload_mb: 100,
            enable_deduplication: true,
            enable_jira: false,
            enable_product_grade: true,
            enable_user_profile_editable: true,
            time_zone: "UTC".to_string(),
            version: 0,
            updated_at: None,
        }
    }
}

impl SystemSettings {
    /// True if this value was never committed to a store
    pub fn is_default_instance(&self) -> bool {
        self.version == 0 && self.updated_at.is_none()
    }
}

/// A partial update to [`SystemSettings`]. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_upload_mb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_deduplication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_jira: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_product_grade: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_user_profile_editable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_upload_mb(mut self, mb: u32) -> Self {
        self.max_upload_mb = Some(mb);
        self
    }

    pub fn enable_deduplication(mut self, enable: bool) -> Self {
        self.enable_deduplication = Some(enable);
        self
    }

    pub fn enable_jira(mut self, enable: bool) -> Self {
        self.enable_jira = Some(enable);
        self
    }

    pub fn enable_product_grade(mut self, enable: bool) -> Self {
        self.enable_product_grade = Some(enable);
        self
    }

    pub fn enable_user_profile_editable(mut self, enable: bool) -> Self {
        self.enable_user_profile_editable = Some(enable);
        self
    }

    pub fn time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = Some(tz.into());
        self
    }

    /// True if no field is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Reject updates the store must never see
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(SettingsError::ValidationError(
                "update contains no changes".to_string(),
            ));
        }

        if let Some(mb) = self.max_upload_mb {
            if mb == 0 || mb > MAX_UPLOAD_LIMIT_MB {
                return Err(SettingsError::ValidationError(format!(
                    "max_upload_mb must be between 1 and {}, got {}",
                    MAX_UPLOAD_LIMIT_MB, mb
                )));
            }
        }

        if let Some(tz) = &self.time_zone {
            if tz.trim().is_empty() {
                return Err(SettingsError::ValidationError(
                    "time_zone must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Produce the record that results from applying this update to `base`.
    pub fn apply(&self, base: &SystemSettings) -> SystemSettings {
        SystemSettings {
            max_upload_mb: self.max_upload_mb.unwrap_or(base.max_upload_mb),
            enable_deduplication: self
                .enable_deduplication
                .unwrap_or(base.enable_deduplication),
            enable_jira: self.enable_jira.unwrap_or(base.enable_jira),
            enable_product_grade: self
                .enable_product_grade
                .unwrap_or(base.enable_product_grade),
            enable_user_profile_editable: self
                .enable_user_profile_editable
                .unwrap_or(base.enable_user_profile_editable),
            time_zone: self
                .time_zone
                .as_ref()
                .map(|tz| tz.trim().to_string())
                .unwrap_or_else(|| base.time_zone.clone()),
            version: base.version + 1,
            updated_at: Some(Utc::now()),
        }
    }
}
