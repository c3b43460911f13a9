//! # Warden Settings (warden-settings)
//!
//! Request-scoped caching of the singleton system settings record.
//!
//! ## Features
//!
//! - One settings fetch per unit of work, shared by every reader in it
//! - Scope entries keyed by worker and cleared when the unit of work ends,
//!   whether it succeeded, failed or was dropped
//! - A write clears the writer's own entry before `write` returns, so later
//!   reads in the same unit of work see the new record
//! - Reads degrade to default settings while the store is unreachable or
//!   unprovisioned; other failures still propagate
//! - Memory and JSON file backends
//!
//! ## Example
//!
//! ```no_run
//! use warden_settings::{SettingsConfig, SettingsRuntime, SettingsUpdate, WorkerId};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SettingsRuntime::new(SettingsConfig::file("./data/settings.json"))?;
//!
//!     let worker = WorkerId::next();
//!     let upload_limit = runtime
//!         .lifecycle()
//!         .run(worker, async {
//!             // Served from the scope entry loaded when the unit of work began
//!             let before = runtime.accessor().get(false).await?;
//!
//!             runtime
//!                 .store()
//!                 .write(SettingsUpdate::new().max_upload_mb(before.max_upload_mb * 2))
//!                 .await?;
//!
//!             // The write invalidated this worker's entry; this read refetches
//!             let after = runtime.accessor().get(false).await?;
//!             Ok::<_, warden_settings::SettingsError>(after.max_upload_mb)
//!         })
//!         .await?;
//!
//!     println!("Upload limit is now {} MB", upload_limit);
//!     Ok(())
//! }
//! ```
//!
//! Outside any unit of work, such as in a maintenance command, read with
//! `no_cache`:
//!
//! ```no_run
//! # use warden_settings::{SettingsConfig, SettingsRuntime};
//! # async fn example() -> anyhow::Result<()> {
//! let runtime = SettingsRuntime::new(SettingsConfig::from_env()?)?;
//! let settings = runtime.accessor().get(true).await?;
//! println!("time zone: {}", settings.time_zone);
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod runtime;
pub mod settings;
pub mod store;
pub mod worker;

// Re-export main types for convenience
pub use accessor::SettingsAccessor;
pub use cache::{CacheStats, InvalidationReason, InvalidationSubscriber, ScopeCache};
pub use config::{BackendKind, SettingsConfig, SettingsConfigBuilder};
pub use error::{Result, SettingsError};
pub use lifecycle::{ScopeGuard, ScopeLifecycle};
pub use runtime::SettingsRuntime;
pub use settings::{SettingsUpdate, SystemSettings};
pub use store::{
    FileBackend, MemoryBackend, SettingsBackend, SettingsStore, SettingsWritten, WriteListener,
};
pub use worker::WorkerId;
