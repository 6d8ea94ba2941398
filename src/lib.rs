//! Lookaside - an in-memory key/value cache
//!
//! Per-entry TTL expiration plus an optional loader whose concurrent calls
//! for the same key are coalesced into a single execution.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{Cache, CacheStats};
pub use config::Config;
pub use error::{BoxError, CacheError, Result};
