//! # Request-Scoped Settings Cache
//!
//! One settings snapshot per worker, valid for exactly one unit of work.
//!
//! - [`ScopeCache`]: the per-worker map
//! - [`InvalidationSubscriber`]: clears the writer's entry on committed writes
//! - [`CacheStats`]: hit/miss/load/clear counters
//!
//! Population and end-of-unit clearing are driven by
//! [`ScopeLifecycle`](crate::lifecycle::ScopeLifecycle).

pub mod invalidation;
pub mod scope;
pub mod types;

pub use invalidation::{InvalidationReason, InvalidationSubscriber};
pub use scope::ScopeCache;
pub use types::CacheStats;
