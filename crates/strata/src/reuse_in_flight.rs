// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deduplication of concurrent lookups for the same key.
//!
//! [`ReuseInFlight`] keeps at most one outstanding `get` per key on the wrapped cache.
//! Concurrent callers for a key share that request and all observe the same value or error.
//!
//! # Lifecycle
//!
//! A request is registered by the first caller for a key and removed exactly once, on
//! whichever terminal event happens first:
//!
//! - the wrapped cache produced a value or absence,
//! - the wrapped cache failed,
//! - every caller waiting on the request was dropped. The underlying request is dropped too.
//!
//! After removal the next caller for the key starts a brand-new request.

use std::{
    fmt::Debug,
    hash::Hash,
    ptr,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use strata_tier::{Cache, Error};

use crate::telemetry::{self, Activity, Operator};

type SharedRequest<V> = Shared<BoxFuture<'static, Result<Option<V>, Error>>>;
type Registry<K, V> = DashMap<K, Weak<Flight<K, V>>>;

/// One request in flight, shared by every caller for its key.
///
/// Callers hold strong references; the registry holds a weak one. When the last caller
/// goes away the flight is dropped, which retires it and drops the underlying request.
struct Flight<K: Eq + Hash, V> {
    key: K,
    registry: Arc<Registry<K, V>>,
    request: SharedRequest<V>,
    retired: AtomicBool,
}

impl<K: Eq + Hash, V> Flight<K, V> {
    /// Removes this flight from the registry, once.
    ///
    /// Only the entry pointing at this flight is removed; a newer flight registered under
    /// the same key is left alone.
    fn retire(&self) {
        if self.retired.swap(true, Ordering::AcqRel) {
            return;
        }

        let removed = self
            .registry
            .remove_if(&self.key, |_, registered| ptr::eq(registered.as_ptr(), self));
        if removed.is_some() {
            telemetry::emit(Operator::ReuseInFlight, Activity::Retired);
        }
    }
}

impl<K: Eq + Hash, V> Drop for Flight<K, V> {
    fn drop(&mut self) {
        self.retire();
    }
}

/// A cache decorator that shares concurrent lookups for the same key.
///
/// - `get` joins the request already in flight for the key, if any. Otherwise it starts one
///   on the wrapped cache and registers it until it completes, fails or is abandoned by all
///   of its callers.
/// - `set` and `clear` pass through unchanged.
///
/// Lookups for different keys never wait on each other. Clones share the wrapped cache and
/// the registry.
///
/// # Examples
///
/// ```
/// use strata::{Cache, CacheExt, RamCache};
/// # futures::executor::block_on(async {
///
/// let cache = RamCache::<String, i32>::new().reuse_in_flight();
/// let key = "key".to_string();
/// cache.set(&key, 1).await?;
///
/// let (a, b) = futures::join!(cache.get(&key), cache.get(&key));
/// assert_eq!(a?, Some(1));
/// assert_eq!(b?, Some(1));
/// assert_eq!(cache.in_flight(), 0);
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct ReuseInFlight<C, K: Eq + Hash, V> {
    inner: Arc<C>,
    registry: Arc<Registry<K, V>>,
}

/// Wraps `cache` so that concurrent lookups for the same key share one request.
pub fn reuse_in_flight<C, K, V>(cache: C) -> ReuseInFlight<C, K, V>
where
    K: Eq + Hash,
{
    ReuseInFlight {
        inner: Arc::new(cache),
        registry: Arc::new(DashMap::new()),
    }
}

impl<C, K, V> ReuseInFlight<C, K, V>
where
    K: Eq + Hash,
{
    /// Returns the wrapped cache.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Returns the number of requests currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if a request for `key` is currently in flight.
    #[must_use]
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.registry.contains_key(key)
    }
}

impl<C, K, V> ReuseInFlight<C, K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Cache<K, V> + 'static,
{
    /// Returns the flight for `key`, starting one if none is alive.
    fn join(&self, key: &K) -> Arc<Flight<K, V>> {
        // A flight must never be dropped while a shard guard is held: its drop re-enters the
        // registry. Only weak references are replaced under the guard.
        match self.registry.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if let Some(flight) = occupied.get().upgrade() {
                    telemetry::emit(Operator::ReuseInFlight, Activity::Joined);
                    return flight;
                }
                let flight = self.start(key);
                occupied.insert(Arc::downgrade(&flight));
                flight
            }
            Entry::Vacant(vacant) => {
                let flight = self.start(key);
                vacant.insert(Arc::downgrade(&flight));
                flight
            }
        }
    }

    fn start(&self, key: &K) -> Arc<Flight<K, V>> {
        let inner = Arc::clone(&self.inner);
        let owned_key = key.clone();
        let request = async move { inner.get(&owned_key).await }.boxed().shared();

        Arc::new(Flight {
            key: key.clone(),
            registry: Arc::clone(&self.registry),
            request,
            retired: AtomicBool::new(false),
        })
    }
}

impl<C, K, V> Clone for ReuseInFlight<C, K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C, K, V> Debug for ReuseInFlight<C, K, V>
where
    C: Debug,
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReuseInFlight")
            .field("inner", &self.inner)
            .field("in_flight", &self.registry.len())
            .finish()
    }
}

impl<K, V, C> Cache<K, V> for ReuseInFlight<C, K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Cache<K, V> + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let flight = self.join(key);
        let result = flight.request.clone().await;
        flight.retire();
        result
    }

    fn set(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send {
        self.inner.set(key, value)
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use strata_tier::testing::{Gate, MockCache};

    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn retire_only_removes_its_own_registration() {
        let mock = MockCache::<u32, u32>::new();
        let cache = reuse_in_flight(mock);

        let stale = cache.start(&1);
        let current = cache.start(&1);
        cache.registry.insert(1, Arc::downgrade(&current));

        stale.retire();
        assert!(cache.is_in_flight(&1), "a stale flight must not evict the current one");

        current.retire();
        assert!(!cache.is_in_flight(&1));
    }

    #[test]
    fn retire_is_idempotent() {
        let cache = reuse_in_flight(MockCache::<u32, u32>::new());
        let flight = cache.join(&1);
        assert_eq!(cache.in_flight(), 1);

        flight.retire();
        flight.retire();
        drop(flight);
        assert_eq!(cache.in_flight(), 0);
    }

    #[test]
    fn join_reuses_a_live_flight() {
        let gate = Gate::new();
        let mock = MockCache::<u32, u32>::new().with_gate(gate.clone());
        let cache = reuse_in_flight(mock.clone());

        let first = cache.join(&1);
        let second = cache.join(&1);
        assert!(Arc::ptr_eq(&first, &second));

        gate.open();
        assert_eq!(block_on(first.request.clone()).unwrap(), None);
        assert_eq!(mock.get_count(&1), 1);
    }

    #[test]
    fn dead_registration_is_replaced() {
        let mock = MockCache::<u32, u32>::new();
        let cache = reuse_in_flight(mock.clone());
        cache.registry.insert(7, Weak::new());

        let replacement = cache.join(&7);
        assert!(cache.is_in_flight(&7));
        assert_eq!(block_on(replacement.request.clone()).unwrap(), None);
        assert_eq!(mock.get_count(&7), 1);

        replacement.retire();
        assert!(!cache.is_in_flight(&7));
    }

    #[test]
    fn debug_reports_in_flight_count() {
        let cache = reuse_in_flight(MockCache::<u32, u32>::new());
        let _flight = cache.join(&3);
        let debug_str = format!("{cache:?}");
        assert!(debug_str.contains("in_flight: 1"), "got: {debug_str}");
    }
}
