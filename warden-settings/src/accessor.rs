//! Read entry point for system settings

use crate::cache::ScopeCache;
use crate::error::Result;
use crate::settings::SystemSettings;
use crate::store::SettingsStore;
use crate::worker::WorkerId;
use std::sync::Arc;
use tracing::{debug, warn};

/// Serves the current system settings to application code.
///
/// Reads consult the worker's scope entry first. A miss goes to the store
/// but does not populate the cache: only
/// [`ScopeLifecycle`](crate::lifecycle::ScopeLifecycle) creates entries, so
/// an ad-hoc read outside a unit of work cannot leave one behind.
#[derive(Clone)]
pub struct SettingsAccessor {
    store: Arc<SettingsStore>,
    cache: Arc<ScopeCache<SystemSettings>>,
}

impl SettingsAccessor {
    pub fn new(store: Arc<SettingsStore>, cache: Arc<ScopeCache<SystemSettings>>) -> Self {
        Self { store, cache }
    }

    /// Settings for the current worker.
    ///
    /// With `no_cache` the store is always queried and the cache is neither
    /// read nor written. Use it from maintenance tooling and anywhere no unit
    /// of work has been started.
    pub async fn get(&self, no_cache: bool) -> Result<Arc<SystemSettings>> {
        self.get_for(WorkerId::current(), no_cache).await
    }

    /// Settings as seen by `worker`
    pub async fn get_for(&self, worker: WorkerId, no_cache: bool) -> Result<Arc<SystemSettings>> {
        if no_cache {
            debug!("Bypassing scope cache for {}", worker);
            return self.fetch_or_default().await;
        }

        if let Some(cached) = self.cache.get(worker) {
            return Ok(cached);
        }

        self.fetch_or_default().await
    }

    /// Fetch from the store, degrading to defaults when it is not ready.
    /// Any other failure reaches the caller.
    async fn fetch_or_default(&self) -> Result<Arc<SystemSettings>> {
        match self.store.fetch_fresh().await {
            Ok(settings) => Ok(Arc::new(settings)),
            Err(e) if e.is_store_not_ready() => {
                warn!("Using default system settings: {}", e);
                Ok(Arc::new(SystemSettings::default()))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingsError;
    use crate::store::{FileBackend, MemoryBackend};
    use tempfile::TempDir;

    fn seeded(max_upload_mb: u32) -> (Arc<MemoryBackend>, SettingsAccessor, Arc<ScopeCache>) {
        let backend = Arc::new(MemoryBackend::with_settings(SystemSettings {
            max_upload_mb,
            ..Default::default()
        }));
        let store = Arc::new(SettingsStore::new(backend.clone(), 8));
        let cache = Arc::new(ScopeCache::new());
        (backend, SettingsAccessor::new(store, cache.clone()), cache)
    }

    #[tokio::test]
    async fn test_hit_returns_cached_value_without_fetching() {
        let (backend, accessor, cache) = seeded(10);
        let worker = WorkerId::next();
        let cached = Arc::new(SystemSettings {
            max_upload_mb: 55,
            ..Default::default()
        });
        cache.put(worker, cached.clone());

        let read = accessor.get_for(worker, false).await.unwrap();

        assert!(Arc::ptr_eq(&read, &cached));
        assert_eq!(backend.load_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_without_populating() {
        let (backend, accessor, cache) = seeded(10);
        let worker = WorkerId::next();

        let read = accessor.get_for(worker, false).await.unwrap();

        assert_eq!(read.max_upload_mb, 10);
        assert_eq!(backend.load_count(), 1);
        assert!(!cache.contains(worker));
    }

    #[tokio::test]
    async fn test_no_cache_bypasses_existing_entry() {
        let (backend, accessor, cache) = seeded(10);
        let worker = WorkerId::next();
        cache.put(
            worker,
            Arc::new(SystemSettings {
                max_upload_mb: 55,
                ..Default::default()
            }),
        );
        let before = cache.stats();

        let read = accessor.get_for(worker, true).await.unwrap();

        assert_eq!(read.max_upload_mb, 10);
        assert_eq!(backend.load_count(), 1);
        assert_eq!(cache.stats(), before);
        assert_eq!(cache.get(worker).unwrap().max_upload_mb, 55);
    }

    #[tokio::test]
    async fn test_unavailable_store_yields_defaults() {
        let (backend, accessor, _cache) = seeded(10);
        backend.set_available(false);

        let read = accessor.get(false).await.unwrap();
        assert_eq!(*read, SystemSettings::default());

        let read = accessor.get(true).await.unwrap();
        assert!(read.is_default_instance());
    }

    #[tokio::test]
    async fn test_unprovisioned_store_yields_defaults() {
        let store = Arc::new(SettingsStore::new(Arc::new(MemoryBackend::new()), 8));
        let accessor = SettingsAccessor::new(store, Arc::new(ScopeCache::new()));

        let read = accessor.get(true).await.unwrap();
        assert!(read.is_default_instance());
    }

    #[tokio::test]
    async fn test_corrupt_record_propagates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let store = Arc::new(SettingsStore::new(Arc::new(FileBackend::new(&path)), 8));
        let accessor = SettingsAccessor::new(store, Arc::new(ScopeCache::new()));

        let err = accessor.get(true).await.unwrap_err();
        assert!(matches!(err, SettingsError::SerializationError(_)));
    }
}
