// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for in-memory caches.

use std::{hash::Hash, marker::PhantomData};

use crate::cache::RamCache;

/// Builder for a [`RamCache`].
///
/// # Examples
///
/// ```
/// use strata_memory::RamCache;
///
/// let cache = RamCache::<String, i32>::builder()
///     .max_capacity(1000)
///     .initial_capacity(100)
///     .name("my-cache")
///     .build();
/// ```
#[derive(Debug)]
pub struct RamCacheBuilder<K, V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Default for RamCacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RamCacheBuilder<K, V> {
    /// Creates a builder for an unbounded, unnamed cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Bounds the number of entries.
    ///
    /// Past the bound, moka's `TinyLFU` policy chooses entries to evict. Without a bound the
    /// cache is limited only by available memory.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Pre-allocates room for `capacity` entries.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Names the cache, for debugging output.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured cache.
    #[must_use]
    pub fn build(self) -> RamCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        RamCache::from_builder(&self)
    }
}
