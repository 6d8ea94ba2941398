//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Entries are immutable once written; an update replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Lifetime relative to `added_at`, zero = no expiration
    pub ttl: Duration,
    /// Write timestamp, refreshed on every set or update
    pub added_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry written now.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Lifetime of the entry, `Duration::ZERO` never expires
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            ttl,
            added_at: Instant::now(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry expires once strictly more than `ttl` has elapsed since it was
    /// written. Entries with a zero TTL never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry evaluated against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        !self.ttl.is_zero() && now.saturating_duration_since(self.added_at) > self.ttl
    }
}
