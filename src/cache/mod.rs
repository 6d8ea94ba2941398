//! Cache Module
//!
//! In-memory caching with per-entry TTL expiration and coalesced loading.

mod entry;
mod facade;
mod group;
mod hooks;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use facade::Cache;
pub use group::{CallGroup, LoadMode, Role};
pub use hooks::{AddedFn, ExpiringLoaderFn};
pub use stats::{CacheStats, StatsRecorder};
pub use store::CacheStore;
