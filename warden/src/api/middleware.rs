//! Settings scope middleware for Axum
//!
//! Each request is one unit of work on a freshly allocated worker. The
//! settings are loaded before the handler runs and the scope entry is
//! cleared once the response is produced, or when the handler unwinds.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;
use warden_settings::WorkerId;

use super::error::ApiError;
use super::routes::AppState;

/// Run the rest of the stack as one settings scope
pub async fn settings_scope(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let worker = WorkerId::next();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let guard = match state.runtime.lifecycle().begin(worker).await {
        Ok(guard) => guard,
        Err(e) => {
            error!("Cannot start settings scope for {} {}: {}", method, path, e);
            return ApiError::from(e).into_response();
        }
    };

    // Handlers may need the worker explicitly (e.g. for logging)
    request.extensions_mut().insert(worker);

    let response = worker.scope(next.run(request)).await;

    if response.status().is_server_error() {
        guard.fail(&format!("{} {} returned {}", method, path, response.status()));
    } else {
        guard.succeed();
    }

    response
}
