//! Wiring of store, scope cache, accessor and lifecycle hooks

use crate::accessor::SettingsAccessor;
use crate::cache::{InvalidationSubscriber, ScopeCache};
use crate::config::{BackendKind, SettingsConfig};
use crate::error::Result;
use crate::lifecycle::ScopeLifecycle;
use crate::settings::SystemSettings;
use crate::store::{FileBackend, MemoryBackend, SettingsBackend, SettingsStore};
use std::sync::Arc;
use tracing::info;

/// Process-wide settings components, built once at startup.
///
/// The scope cache is created here and shared by handle with the accessor,
/// the lifecycle hooks and the invalidation subscriber, which is registered
/// on the store before anything else can write.
#[derive(Clone)]
pub struct SettingsRuntime {
    store: Arc<SettingsStore>,
    cache: Arc<ScopeCache<SystemSettings>>,
    accessor: SettingsAccessor,
    lifecycle: ScopeLifecycle,
}

impl SettingsRuntime {
    /// Build the runtime with the backend named in `config`
    pub fn new(config: SettingsConfig) -> Result<Self> {
        let backend: Arc<dyn SettingsBackend> = match &config.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::File(path) => Arc::new(FileBackend::new(path.clone())),
        };
        Self::with_backend(backend, config)
    }

    /// Build the runtime over an existing backend
    pub fn with_backend(backend: Arc<dyn SettingsBackend>, config: SettingsConfig) -> Result<Self> {
        config.validate()?;

        let mut store = SettingsStore::new(backend, config.event_capacity);
        if let Some(timeout) = config.fetch_timeout {
            store = store.with_fetch_timeout(timeout);
        }
        let store = Arc::new(store);

        let cache = Arc::new(ScopeCache::new());
        store.add_listener(Arc::new(InvalidationSubscriber::new(cache.clone())));

        info!(
            "Settings runtime initialized with {} backend",
            store.backend_name()
        );

        Ok(Self {
            accessor: SettingsAccessor::new(store.clone(), cache.clone()),
            lifecycle: ScopeLifecycle::new(store.clone(), cache.clone()),
            store,
            cache,
        })
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ScopeCache<SystemSettings>> {
        &self.cache
    }

    pub fn accessor(&self) -> &SettingsAccessor {
        &self.accessor
    }

    pub fn lifecycle(&self) -> &ScopeLifecycle {
        &self.lifecycle
    }
}

impl std::fmt::Debug for SettingsRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsRuntime")
            .field("store", &self.store)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsUpdate;
    use crate::worker::WorkerId;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SettingsConfig::builder().event_capacity(0).build();
        assert!(SettingsRuntime::new(config).is_err());
    }

    #[test]
    fn test_subscriber_is_registered() {
        let runtime = SettingsRuntime::new(SettingsConfig::memory()).unwrap();
        assert_eq!(runtime.store().listener_count(), 1);
    }

    #[tokio::test]
    async fn test_file_runtime_round_trip() {
        let tmp = TempDir::new().unwrap();
        let runtime =
            SettingsRuntime::new(SettingsConfig::file(tmp.path().join("settings.json"))).unwrap();
        let worker = WorkerId::next();

        let read = runtime
            .lifecycle()
            .run(worker, async {
                runtime
                    .store()
                    .write(SettingsUpdate::new().max_upload_mb(42))
                    .await?;
                runtime.accessor().get(false).await
            })
            .await
            .unwrap();

        assert_eq!(read.max_upload_mb, 42);
        assert!(runtime.cache().is_empty());
    }
}
