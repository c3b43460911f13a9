//! Backing store for the system settings record
//!
//! [`SettingsStore`] is the only path to the record. It validates writes,
//! commits them through a [`SettingsBackend`], and only after a successful
//! commit publishes a [`SettingsWritten`] event:
//!
//! 1. synchronously to every registered [`WriteListener`], so invalidation
//!    is complete before `write` returns to its caller;
//! 2. then on a broadcast channel for passive observers (audit logging).

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::error::{Result, SettingsError};
use crate::settings::{SettingsUpdate, SystemSettings};
use crate::worker::WorkerId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Persistence medium holding the single settings record
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Read the current record.
    ///
    /// Fails with `StoreUnavailable` when the medium cannot be reached and
    /// `RecordNotFound` when nothing has been provisioned yet.
    async fn load(&self) -> Result<SystemSettings>;

    /// Apply `update` to the stored record and durably persist the result.
    /// An absent record is provisioned from defaults.
    async fn commit(&self, update: &SettingsUpdate) -> Result<SystemSettings>;
}

/// Notification that the settings record was durably written
#[derive(Debug, Clone)]
pub struct SettingsWritten {
    /// Worker that performed the write
    pub writer: WorkerId,
    /// Version of the committed record
    pub version: u64,
    /// The committed record
    pub settings: Arc<SystemSettings>,
    pub written_at: DateTime<Utc>,
}

/// Receives [`SettingsWritten`] synchronously on the writer's worker
pub trait WriteListener: Send + Sync {
    fn on_settings_written(&self, event: &SettingsWritten);
}

/// Front door to the settings record
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    listeners: RwLock<Vec<Arc<dyn WriteListener>>>,
    events: broadcast::Sender<SettingsWritten>,
    fetch_timeout: Option<Duration>,
}

impl SettingsStore {
    /// Create a store over `backend`; `event_capacity` bounds the broadcast
    /// backlog kept for slow observers.
    pub fn new(backend: Arc<dyn SettingsBackend>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            backend,
            listeners: RwLock::new(Vec::new()),
            events,
            fetch_timeout: None,
        }
    }

    /// Bound every fetch; a backend that does not answer in time counts as
    /// unavailable.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Read the record straight from the backend, bypassing every cache
    pub async fn fetch_fresh(&self) -> Result<SystemSettings> {
        let loaded = match self.fetch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.backend.load())
                .await
                .map_err(|_| {
                    SettingsError::StoreUnavailable(format!(
                        "{} backend did not answer within {}ms",
                        self.backend.name(),
                        timeout.as_millis()
                    ))
                })?,
            None => self.backend.load().await,
        };

        match &loaded {
            Ok(settings) => debug!(
                "Fetched system settings v{} from {} backend",
                settings.version,
                self.backend.name()
            ),
            Err(e) => debug!("Fetching system settings failed: {}", e),
        }

        loaded
    }

    /// Write `update` on behalf of the current worker
    pub async fn write(&self, update: SettingsUpdate) -> Result<SystemSettings> {
        self.write_as(WorkerId::current(), update).await
    }

    /// Write `update` on behalf of `writer`.
    ///
    /// Listeners are notified only once the backend reports a durable commit;
    /// a rejected or failed write notifies nobody and returns the error as is.
    pub async fn write_as(&self, writer: WorkerId, update: SettingsUpdate) -> Result<SystemSettings> {
        update.validate()?;

        let committed = self.backend.commit(&update).await?;
        info!(
            "System settings v{} committed by {} to {} backend",
            committed.version,
            writer,
            self.backend.name()
        );

        self.publish(SettingsWritten {
            writer,
            version: committed.version,
            settings: Arc::new(committed.clone()),
            written_at: committed.updated_at.unwrap_or_else(Utc::now),
        });

        Ok(committed)
    }

    /// Register a listener notified on every committed write
    pub fn add_listener(&self, listener: Arc<dyn WriteListener>) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Observe committed writes asynchronously
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsWritten> {
        self.events.subscribe()
    }

    fn publish(&self, event: SettingsWritten) {
        // Snapshot so listeners run without the registry lock held
        let listeners: Vec<Arc<dyn WriteListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for listener in &listeners {
            listener.on_settings_written(&event);
        }

        if self.events.send(event).is_err() {
            debug!("No observers subscribed to settings writes");
        }
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("backend", &self.backend.name())
            .field("listeners", &self.listener_count())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}
