//! In-process settings backend

use crate::error::{Result, SettingsError};
use crate::settings::{SettingsUpdate, SystemSettings};
use crate::store::SettingsBackend;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Settings backend held in memory.
///
/// Starts unprovisioned unless seeded. Availability can be switched off to
/// simulate an unreachable medium, and every load attempt is counted.
#[derive(Debug)]
pub struct MemoryBackend {
    record: Mutex<Option<SystemSettings>>,
    available: AtomicBool,
    loads: AtomicU64,
}

impl MemoryBackend {
    /// Backend with no record provisioned
    pub fn new() -> Self {
        Self {
            record: Mutex::new(None),
            available: AtomicBool::new(true),
            loads: AtomicU64::new(0),
        }
    }

    /// Backend seeded with `settings`
    pub fn with_settings(settings: SystemSettings) -> Self {
        Self {
            record: Mutex::new(Some(settings)),
            ..Self::new()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of load attempts served so far
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Overwrite the record without going through the store, as another
    /// process sharing the medium would. Publishes nothing.
    pub async fn replace(&self, settings: SystemSettings) {
        *self.record.lock().await = Some(settings);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(SettingsError::StoreUnavailable(
                "memory backend is offline".to_string(),
            ))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<SystemSettings> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        self.record
            .lock()
            .await
            .clone()
            .ok_or(SettingsError::RecordNotFound)
    }

    async fn commit(&self, update: &SettingsUpdate) -> Result<SystemSettings> {
        self.ensure_available()?;

        let mut record = self.record.lock().await;
        let base = record.clone().unwrap_or_default();
        let next = update.apply(&base);
        *record = Some(next.clone());

        Ok(next)
    }
}
