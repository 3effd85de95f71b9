// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for code built on [`Cache`].
//!
//! [`MockCache`] is an in-memory cache that records every operation, fails operations on
//! demand and can hold `get` calls pending behind a [`Gate`] to exercise concurrency and
//! cancellation paths.

use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::Arc};

use futures::{FutureExt, channel::oneshot, future::Shared};
use parking_lot::Mutex;

use crate::{Cache, Error};

/// Recorded cache operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp<K, V> {
    /// A get operation was performed with the given key.
    Get(K),
    /// A set operation was performed with the given key and value.
    Set {
        /// The key that was stored.
        key: K,
        /// The value that was stored.
        value: V,
    },
    /// A clear operation was performed.
    Clear,
}

/// A latch that holds waiters until it is opened.
///
/// Once opened a gate stays open. Clones share the same latch.
///
/// # Examples
///
/// ```
/// use strata_tier::testing::Gate;
///
/// let gate = Gate::new();
/// let waiter = gate.wait();
/// gate.open();
/// futures::executor::block_on(waiter);
/// assert!(gate.is_open());
/// ```
#[derive(Clone)]
pub struct Gate {
    sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    receiver: Shared<oneshot::Receiver<()>>,
}

impl Gate {
    /// Creates a closed gate.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            receiver: receiver.shared(),
        }
    }

    /// Opens the gate, releasing every current and future waiter.
    pub fn open(&self) {
        if let Some(sender) = self.sender.lock().take() {
            // The receiver is owned by `self`, so the send cannot fail.
            let _ = sender.send(());
        }
    }

    /// Returns `true` once [`Gate::open`] has been called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Resolves once the gate is open.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        self.receiver.clone().map(|_| ())
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate").field("open", &self.is_open()).finish()
    }
}

type FailPredicate<K, V> = Box<dyn Fn(&CacheOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock cache for testing.
///
/// This cache stores values in memory and can be configured to fail operations on demand,
/// making it useful for testing error handling paths. All operations are recorded for later
/// verification, in the order they started. Clones share storage, records and settings.
///
/// # Examples
///
/// ```
/// use strata_tier::testing::{CacheOp, MockCache};
/// use strata_tier::Cache;
///
/// # futures::executor::block_on(async {
/// let cache = MockCache::<String, i32>::new();
///
/// cache.set(&"key".to_string(), 42).await.unwrap();
/// assert_eq!(cache.get(&"key".to_string()).await.unwrap(), Some(42));
///
/// assert_eq!(
///     cache.operations(),
///     vec![
///         CacheOp::Set { key: "key".to_string(), value: 42 },
///         CacheOp::Get("key".to_string()),
///     ]
/// );
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use strata_tier::testing::{CacheOp, MockCache};
/// use strata_tier::Cache;
///
/// # futures::executor::block_on(async {
/// let cache: MockCache<String, i32> = MockCache::new();
///
/// cache.fail_when(|op| matches!(op, CacheOp::Get(k) if k == "forbidden"));
/// assert!(cache.get(&"forbidden".to_string()).await.is_err());
/// assert!(cache.get(&"allowed".to_string()).await.is_ok());
/// # });
/// ```
///
/// # Holding Gets
///
/// A gated cache records each `get` immediately, then waits for the gate before answering.
///
/// ```
/// use strata_tier::testing::{Gate, MockCache};
/// use strata_tier::Cache;
///
/// # futures::executor::block_on(async {
/// let gate = Gate::new();
/// let cache = MockCache::<u32, u32>::new().with_gate(gate.clone());
///
/// gate.open();
/// assert_eq!(cache.get(&1).await.unwrap(), None);
/// # });
/// ```
pub struct MockCache<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    operations: Arc<Mutex<Vec<CacheOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K, V>>>>,
    gate: Arc<Mutex<Option<Gate>>>,
}

impl<K, V> Debug for MockCache<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCache")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("gate", &self.gate)
            .finish()
    }
}

impl<K, V> Clone for MockCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<K, V> Default for MockCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockCache<K, V> {
    /// Creates a new empty mock cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(HashMap::new())
    }

    /// Creates a mock cache with pre-populated data.
    #[must_use]
    pub fn with_data(data: HashMap<K, V>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            gate: Arc::new(Mutex::new(None)),
        }
    }

    /// Holds every subsequent `get` until `gate` opens.
    #[must_use]
    pub fn with_gate(self, gate: Gate) -> Self {
        *self.gate.lock() = Some(gate);
        self
    }

    /// Stops holding `get` calls. Calls already waiting keep waiting for their gate.
    pub fn remove_gate(&self) {
        *self.gate.lock() = None;
    }

    /// Returns the number of entries in the cache.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }
}

impl<K, V> MockCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Returns true if the cache contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Returns the stored value without recording an operation.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<V> {
        self.data.lock().get(key).cloned()
    }
}

impl<K, V> MockCache<K, V>
where
    K: Clone + PartialEq,
    V: Clone,
{
    /// Sets a predicate that determines which operations fail.
    ///
    /// The predicate receives the operation and returns `true` if it should fail. A failed
    /// operation is still recorded. `clear` is infallible, so the predicate is never
    /// consulted for it.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_tier::testing::{CacheOp, MockCache};
    ///
    /// let cache: MockCache<String, i32> = MockCache::new();
    ///
    /// // Fail only sets
    /// cache.fail_when(|op| matches!(op, CacheOp::Set { .. }));
    /// ```
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<CacheOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Returns how many `get` calls were made for `key`.
    #[must_use]
    pub fn get_count(&self, key: &K) -> usize {
        self.operations
            .lock()
            .iter()
            .filter(|op| matches!(op, CacheOp::Get(k) if k == key))
            .count()
    }

    /// Returns how many `set` calls were made, for any key.
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.operations
            .lock()
            .iter()
            .filter(|op| matches!(op, CacheOp::Set { .. }))
            .count()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: CacheOp<K, V>) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &CacheOp<K, V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<K, V> Cache<K, V> for MockCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let op = CacheOp::Get(key.clone());
        let fail = self.should_fail(&op);
        self.record(op);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }

        if fail {
            return Err(Error::backend("mock: get failed"));
        }
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        let op = CacheOp::Set {
            key: key.clone(),
            value: value.clone(),
        };
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::backend("mock: set failed"));
        }
        self.record(op);
        self.data.lock().insert(key.clone(), value);
        Ok(())
    }

    fn clear(&self) {
        self.record(CacheOp::Clear);
        self.data.lock().clear();
    }
}
