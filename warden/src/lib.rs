pub mod api;
pub mod cli;

pub use api::{ApiServer, ApiServerConfig, AppState};
