//! Binding of scope entries to the lifetime of a unit of work
//!
//! An execution framework calls [`ScopeLifecycle::on_start`] when a worker
//! picks up a unit of work, then exactly one of
//! [`ScopeLifecycle::on_success`] or [`ScopeLifecycle::on_failure`] when it
//! ends. [`ScopeLifecycle::begin`] packages that contract as a
//! [`ScopeGuard`]: both outcomes consume the guard, and dropping it
//! unfinished still clears the entry.

use crate::cache::{InvalidationReason, ScopeCache};
use crate::error::{Result, SettingsError};
use crate::settings::SystemSettings;
use crate::store::SettingsStore;
use crate::worker::WorkerId;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Start/end hooks for units of work
#[derive(Clone)]
pub struct ScopeLifecycle {
    store: Arc<SettingsStore>,
    cache: Arc<ScopeCache<SystemSettings>>,
}

impl ScopeLifecycle {
    pub fn new(store: Arc<SettingsStore>, cache: Arc<ScopeCache<SystemSettings>>) -> Self {
        Self { store, cache }
    }

    /// Load the settings into `worker`'s scope entry.
    ///
    /// A failed fetch leaves the entry absent, so reads fall through to the
    /// store instead of caching a failure. The unit of work itself still
    /// starts.
    pub async fn on_start(&self, worker: WorkerId) -> Result<()> {
        if self.cache.clear(worker) {
            warn!("Discarded scope entry left over on {}", worker);
        }

        match self.store.fetch_fresh().await {
            Ok(settings) => {
                debug!("Scope started on {} with settings v{}", worker, settings.version);
                self.cache.put(worker, Arc::new(settings));
                Ok(())
            }
            Err(e) if e.is_store_not_ready() => {
                warn!("Scope started on {} without cached settings: {}", worker, e);
                Ok(())
            }
            Err(e) => {
                error!("Failed to load settings for {}: {}", worker, e);
                Ok(())
            }
        }
    }

    pub fn on_success(&self, worker: WorkerId) {
        self.end(worker, InvalidationReason::UnitCompleted);
    }

    pub fn on_failure(&self, worker: WorkerId, cause: &dyn fmt::Display) {
        warn!("Unit of work on {} failed: {}", worker, cause);
        self.end(worker, InvalidationReason::UnitFailed);
    }

    /// Start a unit of work on `worker`
    pub async fn begin(&self, worker: WorkerId) -> Result<ScopeGuard> {
        self.on_start(worker).await?;
        Ok(ScopeGuard {
            lifecycle: self.clone(),
            worker,
            finished: false,
        })
    }

    /// Run `work` as one unit of work on `worker`.
    ///
    /// `work` executes with `worker` as [`WorkerId::current`]; its result
    /// decides between the success and failure hooks.
    pub async fn run<F, T, E>(&self, worker: WorkerId, work: F) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display + From<SettingsError>,
    {
        let guard = self.begin(worker).await?;

        match worker.scope(work).await {
            Ok(value) => {
                guard.succeed();
                Ok(value)
            }
            Err(e) => {
                guard.fail(&e);
                Err(e)
            }
        }
    }

    fn end(&self, worker: WorkerId, reason: InvalidationReason) {
        if self.cache.clear(worker) {
            debug!("Scope ended on {}: {}", worker, reason);
        }
    }
}

/// An active unit of work. Finish it with [`succeed`](ScopeGuard::succeed)
/// or [`fail`](ScopeGuard::fail).
#[must_use = "a unit of work must be finished with succeed() or fail()"]
pub struct ScopeGuard {
    lifecycle: ScopeLifecycle,
    worker: WorkerId,
    finished: bool,
}

impl ScopeGuard {
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn succeed(mut self) {
        self.finished = true;
        self.lifecycle.on_success(self.worker);
    }

    pub fn fail(mut self, cause: &dyn fmt::Display) {
        self.finished = true;
        self.lifecycle.on_failure(self.worker, cause);
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Unit of work on {} ended without an outcome", self.worker);
            self.lifecycle
                .end(self.worker, InvalidationReason::UnitAbandoned);
        }
    }
}

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("worker", &self.worker)
            .field("finished", &self.finished)
            .finish()
    }
}
