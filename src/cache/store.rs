//! Cache Store Module
//!
//! Key to entry map behind a read/write lock, with lazy TTL expiration.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::trace;

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

/// The map together with the generation it belongs to.
///
/// `purge` swaps in a fresh map under a new generation so that writes
/// scheduled against the old one can be recognised and dropped.
struct Generation<K, V> {
    id: u64,
    entries: HashMap<K, CacheEntry<V>>,
}

// == Cache Store ==
/// Main cache storage with TTL support.
///
/// Expired entries are never swept in the background; they are deleted when
/// a read discovers them, or dropped wholesale by [`CacheStore::purge`].
pub struct CacheStore<K, V> {
    /// Key-value storage
    state: RwLock<Generation<K, V>>,
    /// Default TTL for writes without an explicit one
    default_ttl: Duration,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL applied to writes that don't specify one, zero = never expire
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            state: RwLock::new(Generation {
                id: 0,
                entries: HashMap::new(),
            }),
            default_ttl,
        }
    }

    /// Default TTL of this store.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Current generation, bumped by every purge.
    pub fn generation(&self) -> u64 {
        self.state.read().id
    }

    /// TTL actually stored for a write asking for `ttl`.
    ///
    /// Anything below one nanosecond falls back to the default TTL.
    pub fn effective_ttl(&self, ttl: Duration) -> Duration {
        if ttl < Duration::from_nanos(1) {
            self.default_ttl
        } else {
            ttl
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if found and not expired. An expired entry is removed
    /// under the write lock before reporting the miss.
    pub fn get(&self, key: &K) -> Option<V> {
        {
            let state = self.state.read();
            match state.entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut state = self.state.write();
        // A writer may have refreshed the key between the two lock sections.
        match state.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                state.entries.remove(key);
                trace!(generation = state.id, "dropped expired entry on read");
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Returns true if a live entry exists. Never mutates the map.
    pub fn contains(&self, key: &K) -> bool {
        self.state
            .read()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Set ==
    /// Stores a key-value pair, resetting its write timestamp.
    ///
    /// # Arguments
    /// * `ttl` - Requested TTL, `Duration::ZERO` uses the default
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, self.effective_ttl(ttl));
        self.state.write().entries.insert(key, entry);
    }

    /// Stores a key-value pair only if the store is still in `generation`.
    ///
    /// Returns false, without writing, when a purge happened in between.
    pub fn set_in_generation(&self, generation: u64, key: K, value: V, ttl: Duration) -> bool {
        let entry = CacheEntry::new(value, self.effective_ttl(ttl));
        let mut state = self.state.write();
        if state.id != generation {
            return false;
        }
        state.entries.insert(key, entry);
        true
    }

    // == Update ==
    /// Read-modify-write of a live entry under one exclusive section.
    ///
    /// Every update holds the write lock from the read to the write-back, so
    /// concurrent updates are serialized and none is lost. `f` must not touch
    /// this store.
    pub fn update<F>(&self, key: &K, f: F, ttl: Duration) -> Result<V>
    where
        F: FnOnce(&V) -> V,
    {
        let ttl = self.effective_ttl(ttl);
        let mut state = self.state.write();
        let next = match state.entries.get(key) {
            Some(entry) if !entry.is_expired() => f(&entry.value),
            Some(_) => {
                state.entries.remove(key);
                return Err(CacheError::NotFound);
            }
            None => return Err(CacheError::NotFound),
        };
        state
            .entries
            .insert(key.clone(), CacheEntry::new(next.clone(), ttl));
        Ok(next)
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether one was present.
    pub fn remove(&self, key: &K) -> bool {
        self.state.write().entries.remove(key).is_some()
    }

    // == Enumeration ==
    /// Snapshot of the keys.
    ///
    /// With `include_expired` false, expired entries are skipped but left in
    /// place; enumeration never mutates the map.
    pub fn keys(&self, include_expired: bool) -> Vec<K> {
        let state = self.state.read();
        state
            .entries
            .iter()
            .filter(|(_, entry)| include_expired || !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of entries, see [`CacheStore::keys`] for `include_expired`.
    pub fn len(&self, include_expired: bool) -> usize {
        let state = self.state.read();
        if include_expired {
            return state.entries.len();
        }
        state
            .entries
            .values()
            .filter(|entry| !entry.is_expired())
            .count()
    }

    /// Returns true if the map holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    // == Purge ==
    /// Replaces the map with an empty one under a new generation.
    ///
    /// Returns the new generation.
    pub fn purge(&self) -> u64 {
        let mut state = self.state.write();
        state.id = state.id.wrapping_add(1);
        state.entries = HashMap::new();
        state.id
    }
}
