//! Worker identity used as the scope cache key
//!
//! A worker is whatever runs one unit of work at a time: an OS thread in a
//! thread pool, or an async task whose identity is installed with
//! [`WorkerId::scope`]. Identifiers are process-local and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static CURRENT_WORKER: WorkerId;
}

thread_local! {
    static THREAD_WORKER: WorkerId = WorkerId::next();
}

/// Identifier of the execution context running the current unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Allocate a fresh identifier, distinct from every other one in this process
    pub fn next() -> Self {
        WorkerId(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The worker running the caller.
    ///
    /// Inside [`WorkerId::scope`] this is the scoped id; elsewhere it is a
    /// stable id for the current OS thread.
    pub fn current() -> Self {
        CURRENT_WORKER
            .try_with(|worker| *worker)
            .unwrap_or_else(|_| THREAD_WORKER.with(|worker| *worker))
    }

    /// True when called inside a [`WorkerId::scope`]
    pub fn is_scoped() -> bool {
        CURRENT_WORKER.try_with(|_| ()).is_ok()
    }

    /// Run `future` with `self` as the current worker
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_WORKER.scope(self, future).await
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
impl From<u64> for WorkerId {
    fn from(raw: u64) -> Self {
        WorkerId(raw)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}
