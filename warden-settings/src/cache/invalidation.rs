//! Scope entry invalidation
//!
//! Entries are removed for three reasons: the unit of work completed, it
//! failed, or the worker wrote the settings record. Write invalidation is
//! limited to the writer's own entry. Other workers keep the snapshot they
//! loaded when their unit of work started until that unit ends.

use crate::cache::scope::ScopeCache;
use crate::settings::SystemSettings;
use crate::store::{SettingsWritten, WriteListener};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Reason a scope entry was removed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// The unit of work finished normally
    UnitCompleted,

    /// The unit of work failed
    UnitFailed,

    /// The unit of work was abandoned without reporting an outcome
    UnitAbandoned,

    /// The worker committed a write to the settings record
    SettingsWritten { version: u64 },
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::UnitCompleted => write!(f, "unit of work completed"),
            InvalidationReason::UnitFailed => write!(f, "unit of work failed"),
            InvalidationReason::UnitAbandoned => write!(f, "unit of work abandoned"),
            InvalidationReason::SettingsWritten { version } => {
                write!(f, "settings written (v{})", version)
            }
        }
    }
}

/// Clears the writer's scope entry whenever the settings record is written
pub struct InvalidationSubscriber {
    cache: Arc<ScopeCache<SystemSettings>>,
}

impl InvalidationSubscriber {
    pub fn new(cache: Arc<ScopeCache<SystemSettings>>) -> Self {
        Self { cache }
    }
}

impl WriteListener for InvalidationSubscriber {
    fn on_settings_written(&self, event: &SettingsWritten) {
        let reason = InvalidationReason::SettingsWritten {
            version: event.version,
        };
        if self.cache.clear(event.writer) {
            debug!("Invalidated scope entry for {}: {}", event.writer, reason);
        }
    }
}
