//! Hook Functions Module
//!
//! Caller-supplied callbacks: the on-added notification and the value loader.

use std::sync::Arc;
use std::time::Duration;

use crate::error::BoxError;

/// Called after every write with the written key and value.
pub type AddedFn<K, V> = dyn Fn(&K, &V) + Send + Sync;

/// Loads a missing value. A `None` expiry stores it with the default TTL.
pub type ExpiringLoaderFn<K, V> =
    dyn Fn(&K) -> std::result::Result<(V, Option<Duration>), BoxError> + Send + Sync;

/// The hooks configured on a cache.
///
/// Only one loader is kept; a plain loader is stored as an expiring loader
/// that never asks for a specific expiry.
pub(crate) struct Hooks<K, V> {
    pub(crate) on_added: Option<Arc<AddedFn<K, V>>>,
    pub(crate) loader: Option<Arc<ExpiringLoaderFn<K, V>>>,
}

impl<K, V> Default for Hooks<K, V> {
    fn default() -> Self {
        Self {
            on_added: None,
            loader: None,
        }
    }
}

impl<K, V> Clone for Hooks<K, V> {
    fn clone(&self) -> Self {
        Self {
            on_added: self.on_added.clone(),
            loader: self.loader.clone(),
        }
    }
}

impl<K, V> Hooks<K, V> {
    pub(crate) fn notify_added(&self, key: &K, value: &V) {
        if let Some(hook) = &self.on_added {
            hook(key, value);
        }
    }
}

/// Adapts a plain loader into the expiring form.
pub(crate) fn plain_loader<K, V, E, F>(loader: F) -> Arc<ExpiringLoaderFn<K, V>>
where
    K: 'static,
    V: 'static,
    F: Fn(&K) -> std::result::Result<V, E> + Send + Sync + 'static,
    E: Into<BoxError> + 'static,
{
    Arc::new(move |key: &K| -> std::result::Result<(V, Option<Duration>), BoxError> {
        loader(key)
            .map(|value| (value, None))
            .map_err(Into::into)
    })
}
