//! Maintenance commands run outside any request
//!
//! No settings scope exists here, so every read bypasses the scope cache.

use std::path::PathBuf;

use anyhow::{Context, Result};
use warden_settings::{BackendKind, SettingsConfig, SettingsRuntime, SettingsUpdate, SystemSettings};

/// Build the settings runtime from the environment, with an optional
/// settings file taking precedence over `WARDEN_SETTINGS_FILE`.
pub fn build_runtime(settings_file: Option<PathBuf>) -> Result<SettingsRuntime> {
    let mut config = SettingsConfig::from_env().context("Invalid settings configuration")?;
    if let Some(path) = settings_file {
        config.backend = BackendKind::File(path);
    }

    SettingsRuntime::new(config).context("Failed to initialize settings runtime")
}

/// Render the current settings, as JSON or a plain listing
pub async fn show_settings(runtime: &SettingsRuntime, json: bool) -> Result<String> {
    let settings = runtime
        .accessor()
        .get(true)
        .await
        .context("Failed to read system settings")?;

    if json {
        Ok(serde_json::to_string_pretty(&*settings)?)
    } else {
        Ok(render(&settings))
    }
}

/// Write `update` and render the committed record
pub async fn set_settings(runtime: &SettingsRuntime, update: SettingsUpdate) -> Result<String> {
    let written = runtime
        .store()
        .write(update)
        .await
        .context("Failed to update system settings")?;

    Ok(render(&written))
}

fn render(settings: &SystemSettings) -> String {
    let updated = settings
        .updated_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never (defaults)".to_string());

    let rows = [
        ("max_upload_mb", settings.max_upload_mb.to_string()),
        ("enable_deduplication", settings.enable_deduplication.to_string()),
        ("enable_jira", settings.enable_jira.to_string()),
        ("enable_product_grade", settings.enable_product_grade.to_string()),
        (
            "enable_user_profile_editable",
            settings.enable_user_profile_editable.to_string(),
        ),
        ("time_zone", settings.time_zone.clone()),
        ("version", settings.version.to_string()),
        ("updated_at", updated),
    ];

    rows.iter()
        .map(|(name, value)| format!("{:<30} {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_show_before_provisioning_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let runtime = SettingsRuntime::new(SettingsConfig::file(tmp.path().join("settings.json"))).unwrap();

        let out = show_settings(&runtime, false).await.unwrap();
        assert!(out.contains("never (defaults)"));
        assert!(out.contains("max_upload_mb"));
        assert!(runtime.cache().is_empty());
    }

    #[tokio::test]
    async fn test_set_then_show() {
        let tmp = TempDir::new().unwrap();
        let runtime = SettingsRuntime::new(SettingsConfig::file(tmp.path().join("settings.json"))).unwrap();

        set_settings(&runtime, SettingsUpdate::new().max_upload_mb(20).time_zone("Asia/Seoul"))
            .await
            .unwrap();

        let out = show_settings(&runtime, true).await.unwrap();
        let parsed: SystemSettings = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.max_upload_mb, 20);
        assert_eq!(parsed.time_zone, "Asia/Seoul");
        assert_eq!(parsed.version, 1);
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_update() {
        let runtime = SettingsRuntime::new(SettingsConfig::memory()).unwrap();
        let err = set_settings(&runtime, SettingsUpdate::new()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to update"));
    }
}
