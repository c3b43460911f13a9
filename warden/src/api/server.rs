//! API server for Warden

use anyhow::{Context, Result};
use axum::{
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use warden_settings::{SettingsRuntime, SettingsStore};

use super::middleware::settings_scope;
use super::routes::{cache_stats, get_settings, health_check, update_settings, AppState};

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("WARDEN_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("WARDEN_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    runtime: SettingsRuntime,
}

impl ApiServer {
    /// Create a new API server with configuration
    pub fn new(config: ApiServerConfig, runtime: SettingsRuntime) -> Self {
        Self { config, runtime }
    }

    /// Build the application router.
    ///
    /// Settings routes run inside a settings scope; `/health` and the cache
    /// counters do not, so they never touch the store.
    pub fn router(runtime: SettingsRuntime) -> Router {
        let state = AppState { runtime };

        Router::new()
            .route("/api/settings", get(get_settings).put(update_settings))
            .route_layer(from_fn_with_state(state.clone(), settings_scope))
            .route("/api/settings/cache", get(cache_stats))
            .route("/health", get(health_check))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
    }

    /// Bind the configured address and serve until the process stops
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        spawn_write_logger(self.runtime.store());

        info!("Starting API server on {}", listener.local_addr()?);
        axum::serve(listener, Self::router(self.runtime)).await?;

        Ok(())
    }
}

/// Log every committed settings write, whichever worker made it
fn spawn_write_logger(store: &SettingsStore) {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(
                    "System settings changed to v{} by {} at {}",
                    event.version, event.writer, event.written_at
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Settings write log lagged, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
