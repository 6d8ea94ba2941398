//! Cache Facade Module
//!
//! The public cache handle: store, call group and hooks wired together.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::hooks::{plain_loader, Hooks};
use crate::cache::{CacheStats, CacheStore, CallGroup, LoadMode, Role, StatsRecorder};
use crate::error::{BoxError, CacheError, Result};

// == Cache ==
/// Concurrency-safe key/value cache with per-entry TTL and coalesced loading.
///
/// The handle is cheap to clone; clones share the same entries.
///
/// ```
/// use std::time::Duration;
/// use lookaside::Cache;
///
/// let cache: Cache<String, u64> = Cache::new(Duration::from_secs(60))
///     .with_loader(|key: &String| -> Result<u64, std::io::Error> { Ok(key.len() as u64) });
///
/// assert_eq!(cache.get(&"four".to_string()).unwrap(), 4);
/// assert!(cache.has(&"four".to_string()));
/// ```
pub struct Cache<K, V> {
    store: Arc<CacheStore<K, V>>,
    group: Arc<CallGroup<K, V>>,
    stats: Arc<StatsRecorder>,
    hooks: Hooks<K, V>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            group: Arc::clone(&self.group),
            stats: Arc::clone(&self.stats),
            hooks: self.hooks.clone(),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL for writes without their own, zero = never expire
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            store: Arc::new(CacheStore::new(default_ttl)),
            group: Arc::new(CallGroup::new()),
            stats: Arc::new(StatsRecorder::default()),
            hooks: Hooks::default(),
        }
    }

    // == Configuration ==
    /// Calls `hook` after every write, outside of any cache lock.
    ///
    /// The hook may use the cache freely.
    pub fn on_added<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.hooks.on_added = Some(Arc::new(hook));
        self
    }

    /// Loads missing values with `loader`, replacing any previous loader.
    pub fn with_loader<F, E>(mut self, loader: F) -> Self
    where
        F: Fn(&K) -> std::result::Result<V, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        self.hooks.loader = Some(plain_loader(loader));
        self
    }

    /// Loads missing values with `loader`, which may also pick the TTL.
    ///
    /// Replaces any previous loader. A `None` TTL stores the value with the
    /// default TTL.
    pub fn with_expiring_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&K) -> std::result::Result<(V, Option<Duration>), BoxError> + Send + Sync + 'static,
    {
        self.hooks.loader = Some(Arc::new(loader));
        self
    }

    /// Default TTL of this cache.
    pub fn default_ttl(&self) -> Duration {
        self.store.default_ttl()
    }

    // == Writes ==
    /// Stores a value with the default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_expire(key, value, Duration::ZERO);
    }

    /// Stores a value with its own TTL; zero falls back to the default.
    pub fn set_with_expire(&self, key: K, value: V, ttl: Duration) {
        if self.hooks.on_added.is_none() {
            self.store.set(key, value, ttl);
            return;
        }
        self.store.set(key.clone(), value.clone(), ttl);
        self.hooks.notify_added(&key, &value);
    }

    /// Atomically replaces a live value with `f(current)`, default TTL.
    ///
    /// All updates are serialized, so concurrent updates are never lost. `f`
    /// runs under the store's write lock and must not use the cache.
    /// Returns the new value, or `NotFound` for a missing or expired key.
    pub fn update<F>(&self, key: &K, f: F) -> Result<V>
    where
        F: FnOnce(&V) -> V,
    {
        self.update_with_expire(key, f, Duration::ZERO)
    }

    /// Like [`Cache::update`], storing the result with `ttl`.
    pub fn update_with_expire<F>(&self, key: &K, f: F, ttl: Duration) -> Result<V>
    where
        F: FnOnce(&V) -> V,
    {
        let value = self.store.update(key, f, ttl)?;
        self.hooks.notify_added(key, &value);
        Ok(value)
    }

    /// Removes a key. Returns whether an entry was there.
    pub fn remove(&self, key: &K) -> bool {
        self.store.remove(key)
    }

    /// Drops every entry and forgets all in-flight loads.
    ///
    /// Loads that were already running still answer their callers, but their
    /// results are not written into the purged cache.
    pub fn purge(&self) {
        let generation = self.store.purge();
        self.group.reset();
        info!(generation, "cache purged");
    }

    // == Reads ==
    /// Returns the value for `key`, loading it on a miss.
    ///
    /// Concurrent misses for the same key share a single loader call and all
    /// receive its outcome. Without a loader a miss is `NotFound`.
    pub fn get(&self, key: &K) -> Result<V> {
        match self.lookup(key) {
            Some(value) => Ok(value),
            None => self.load(key, LoadMode::Wait),
        }
    }

    /// Returns the value only if it is in the cache. Never loads.
    pub fn get_if_present(&self, key: &K) -> Result<V> {
        self.lookup(key).ok_or_else(|| {
            self.stats.record_miss();
            CacheError::NotFound
        })
    }

    /// Returns the value if present; on a miss starts a background load and
    /// reports `NotFound` without waiting for it.
    pub fn get_or_refresh(&self, key: &K) -> Result<V> {
        match self.lookup(key) {
            Some(value) => Ok(value),
            None => self.load(key, LoadMode::Detached),
        }
    }

    /// Returns true if a live entry exists. Does not load or delete.
    pub fn has(&self, key: &K) -> bool {
        self.store.contains(key)
    }

    /// Snapshot of keys; expired ones only with `include_expired`.
    pub fn keys(&self, include_expired: bool) -> Vec<K> {
        self.store.keys(include_expired)
    }

    /// Entry count; expired ones only with `include_expired`.
    pub fn len(&self, include_expired: bool) -> usize {
        self.store.len(include_expired)
    }

    /// Returns true if the cache holds no entries, expired or not.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Current hit, miss and loader counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.store.len(false))
    }

    /// Fast-path read. Only hits are counted here; a miss is counted once
    /// the caller's read is settled.
    fn lookup(&self, key: &K) -> Option<V> {
        let found = self.store.get(key);
        if found.is_some() {
            self.stats.record_hit();
        }
        found
    }

    fn load(&self, key: &K, mode: LoadMode) -> Result<V> {
        let Some(loader) = self.hooks.loader.clone() else {
            self.stats.record_miss();
            return Err(CacheError::NotFound);
        };

        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let hooks = self.hooks.clone();
        let owned_key = key.clone();

        // runs with the generation the probe saw under the group lock, so a
        // purge either precedes this call's registration or forgets it
        let producer = move |generation: u64| {
            stats.record_load();
            debug!(generation, "loading value");
            match loader(&owned_key) {
                Ok((value, ttl)) => {
                    let ttl = ttl.unwrap_or(Duration::ZERO);
                    if store.set_in_generation(generation, owned_key.clone(), value.clone(), ttl) {
                        hooks.notify_added(&owned_key, &value);
                    } else {
                        debug!(generation, "cache purged during load, result not stored");
                    }
                    Ok(value)
                }
                Err(err) => {
                    stats.record_load_failure();
                    warn!(error = %err, "loader failed");
                    Err(CacheError::loader(err))
                }
            }
        };

        let probe = |k: &K| self.store.get(k).ok_or_else(|| self.store.generation());
        let (role, result) = self.group.work(key.clone(), probe, producer, mode);
        match role {
            Role::Cached => self.stats.record_hit(),
            Role::Leader | Role::Follower => self.stats.record_miss(),
        }
        result
    }
}
