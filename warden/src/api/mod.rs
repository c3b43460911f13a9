//! API module for the Warden HTTP server

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::AppState;
pub use server::{ApiServer, ApiServerConfig};
