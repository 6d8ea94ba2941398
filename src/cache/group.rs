//! Call Group Module
//!
//! Duplicate suppression for loader calls. At most one producer runs per key
//! at a time; callers arriving while it runs either wait for its outcome or,
//! in detached mode, are told the key is not there yet.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

type CallMap<K, V> = Arc<Mutex<HashMap<K, Arc<Call<V>>>>>;

/// How a caller takes part in a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Block until the producer's outcome is available.
    Wait,
    /// Return `NotFound` at once; a new producer runs on its own thread.
    Detached,
}

/// What a caller ended up doing inside [`CallGroup::work`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The probe found the value, no producer involved.
    Cached,
    /// This caller registered the call and started the producer.
    Leader,
    /// This caller joined a call someone else started.
    Follower,
}

/// In-flight call record: result slot plus completion signal.
struct Call<V> {
    slot: Mutex<Option<Result<V>>>,
    done: Condvar,
}

impl<V: Clone> Call<V> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    /// Publishes the outcome and wakes every waiter. First outcome wins.
    fn complete(&self, outcome: Result<V>) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            self.done.notify_all();
        }
    }

    fn wait(&self) -> Result<V> {
        let mut slot = self.slot.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut slot);
        }
    }
}

/// Ownership of one registered call, held by whoever runs the producer.
///
/// Dropping it without an outcome (spawn failure, unwinding) still releases
/// the waiters and unregisters the call, so a key can never stay wedged.
struct Flight<K: Eq + Hash, V: Clone> {
    key: K,
    call: Arc<Call<V>>,
    calls: CallMap<K, V>,
    finished: bool,
}

impl<K: Eq + Hash, V: Clone> Flight<K, V> {
    fn run<F>(mut self, producer: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(producer)).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(%message, "loader panicked");
            Err(CacheError::LoaderPanicked(message))
        });
        self.finish(outcome.clone());
        outcome
    }

    fn finish(&mut self, outcome: Result<V>) {
        self.finished = true;
        self.call.complete(outcome);
        self.unregister();
    }

    /// Removes the record, unless a reset already replaced it.
    fn unregister(&self) {
        let mut calls = self.calls.lock();
        if calls
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.call))
        {
            calls.remove(&self.key);
        }
    }
}

impl<K: Eq + Hash, V: Clone> Drop for Flight<K, V> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("in-flight load dropped without a result");
            self.finish(Err(CacheError::LoadAbandoned));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// == Call Group ==
/// A namespace in which loads are executed with duplicate suppression.
///
/// The bookkeeping lock is held only while inspecting or changing call
/// records, never while a producer runs, so a slow load for one key does not
/// hold up any other key.
///
/// There is no timeout: a producer that never returns stalls every waiting
/// caller for its key. Producers are expected to honour their own deadlines.
pub struct CallGroup<K, V> {
    calls: CallMap<K, V>,
}

impl<K, V> Default for CallGroup<K, V> {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
        }
    }
}

impl<K, V> CallGroup<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `producer` for `key` unless a value or a call already exists.
    ///
    /// `probe` is consulted first, under the bookkeeping lock, so that a
    /// value written since the caller's own miss is returned without
    /// starting another load. It must not call back into this group. On a
    /// miss it returns a token that is handed to `producer` if this caller
    /// ends up starting the load, so whatever it captures is observed under
    /// the same lock that [`CallGroup::reset`] takes.
    ///
    /// - probe hit: `(Role::Cached, Ok(value))`
    /// - call in flight: `Follower`, with its outcome for [`LoadMode::Wait`]
    ///   or `NotFound` for [`LoadMode::Detached`]
    /// - nothing in flight: `Leader`; the producer runs on this thread for
    ///   [`LoadMode::Wait`], or on a new thread with an immediate `NotFound`
    ///   for [`LoadMode::Detached`]
    ///
    /// A panicking producer yields [`CacheError::LoaderPanicked`] for every
    /// caller of that call.
    pub fn work<P, S, F>(&self, key: K, probe: P, producer: F, mode: LoadMode) -> (Role, Result<V>)
    where
        P: FnOnce(&K) -> std::result::Result<V, S>,
        S: Send + 'static,
        F: FnOnce(S) -> Result<V> + Send + 'static,
    {
        let mut calls = self.calls.lock();
        let miss = match probe(&key) {
            Ok(value) => return (Role::Cached, Ok(value)),
            Err(miss) => miss,
        };

        let existing = calls.get(&key).map(Arc::clone);
        if let Some(call) = existing {
            drop(calls);
            return match mode {
                LoadMode::Detached => (Role::Follower, Err(CacheError::NotFound)),
                LoadMode::Wait => {
                    debug!("joined in-flight load");
                    (Role::Follower, call.wait())
                }
            };
        }

        let call = Arc::new(Call::new());
        calls.insert(key.clone(), Arc::clone(&call));
        drop(calls);

        let flight = Flight {
            key,
            call,
            calls: Arc::clone(&self.calls),
            finished: false,
        };

        match mode {
            LoadMode::Wait => (Role::Leader, flight.run(move || producer(miss))),
            LoadMode::Detached => {
                let spawned = thread::Builder::new()
                    .name("lookaside-loader".to_string())
                    .spawn(move || {
                        let _ = flight.run(move || producer(miss));
                    });
                if let Err(err) = spawned {
                    warn!(error = %err, "failed to spawn detached loader");
                }
                (Role::Leader, Err(CacheError::NotFound))
            }
        }
    }

    /// Number of calls currently registered.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets every registered call.
    ///
    /// Producers already running still complete and still hand their outcome
    /// to the callers that joined them; the next miss starts a fresh call.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}
