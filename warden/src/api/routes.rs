//! API routes for the Warden server

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue},
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use tracing::info;
use warden_settings::{CacheStats, SettingsRuntime, SettingsUpdate, SystemSettings, WorkerId};

use super::error::ApiError;

/// Response header carrying the version of the settings record served
pub const SETTINGS_VERSION_HEADER: HeaderName = HeaderName::from_static("x-settings-version");

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub runtime: SettingsRuntime,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Current system settings, served from the request's scope
pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let settings = state.runtime.accessor().get(false).await?;
    Ok(settings_response(&settings))
}

/// Apply a partial update and return the settings as this request now sees them
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(worker): Extension<WorkerId>,
    Json(update): Json<SettingsUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let written = state.runtime.store().write(update).await?;
    info!("Settings v{} written via API by {}", written.version, worker);

    let settings = state.runtime.accessor().get(false).await?;
    Ok(settings_response(&settings))
}

/// Scope cache counters
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.runtime.cache().stats())
}

fn settings_response(settings: &SystemSettings) -> impl IntoResponse {
    let version = HeaderValue::from(settings.version);
    ([(SETTINGS_VERSION_HEADER, version)], Json(settings.clone()))
}
