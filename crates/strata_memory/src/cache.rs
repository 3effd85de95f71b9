// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The moka-backed cache stage.

use std::{fmt::Debug, hash::Hash, sync::Arc};

use moka::future::Cache as MokaCache;
use strata_tier::{Cache, Error};

use crate::builder::RamCacheBuilder;

/// A concurrent in-memory cache stage.
///
/// `get` and `set` never fail. `clear` invalidates every entry. Clones share the same
/// storage, so a clone kept outside a pipeline observes everything the pipeline stores.
///
/// # Examples
///
/// ```
/// use strata_memory::RamCache;
/// use strata_tier::Cache;
/// # futures::executor::block_on(async {
///
/// let cache = RamCache::<String, i32>::new();
///
/// cache.set(&"key".to_string(), 42).await?;
/// assert_eq!(cache.get(&"key".to_string()).await?, Some(42));
/// # Ok::<(), strata_tier::Error>(())
/// # });
/// ```
pub struct RamCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<MokaCache<K, V>>,
}

impl<K, V> Clone for RamCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for RamCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RamCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a cache holding at most `max_capacity` entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_memory::RamCache;
    ///
    /// let cache = RamCache::<String, i32>::with_capacity(1000);
    /// ```
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a builder for configuring a cache.
    #[must_use]
    pub fn builder() -> RamCacheBuilder<K, V> {
        RamCacheBuilder::new()
    }

    pub(crate) fn from_builder(builder: &RamCacheBuilder<K, V>) -> Self {
        let mut moka_builder = MokaCache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: Arc::new(moka_builder.build()),
        }
    }

    /// Returns the approximate number of entries.
    ///
    /// moka applies writes lazily, so the count may briefly lag behind recent stores.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Returns `true` if the cache reports no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the name given at construction, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name()
    }
}

impl<K, V> Debug for RamCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RamCache")
            .field("name", &self.inner.name())
            .field("len", &self.inner.entry_count())
            .finish()
    }
}

impl<K, V> Cache<K, V> for RamCache<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        Ok(self.inner.get(key).await)
    }

    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        self.inner.insert(key.clone(), value).await;
        Ok(())
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }
}
