// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{marker::PhantomData, path::PathBuf};

use strata_tier::Error;

use crate::{cache::DiskCache, store::Store};

/// The size bound used unless [`DiskCacheBuilder::capacity`] is called: 100 MiB.
pub const DEFAULT_CAPACITY: u64 = 100 * 1024 * 1024;

/// Builder for a [`DiskCache`].
///
/// # Examples
///
/// ```
/// use strata_disk::DiskCache;
/// # let dir = tempfile::tempdir().unwrap();
///
/// let cache = DiskCache::<String, String>::builder(dir.path())
///     .capacity(10 * 1024 * 1024)
///     .build()?;
/// assert_eq!(cache.size(), 0);
/// # Ok::<(), strata_tier::Error>(())
/// ```
#[derive(Debug)]
pub struct DiskCacheBuilder<K, V> {
    path: PathBuf,
    capacity: u64,
    _types: PhantomData<fn(K) -> V>,
}

impl<K, V> DiskCacheBuilder<K, V> {
    /// Creates a builder for a cache stored under `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: DEFAULT_CAPACITY,
            _types: PhantomData,
        }
    }

    /// Bounds the total size of stored entries, in bytes.
    #[must_use]
    pub fn capacity(mut self, bytes: u64) -> Self {
        self.capacity = bytes;
        self
    }

    /// Opens the cache.
    ///
    /// Creates the directory if needed, accounts for entries left by a previous run and
    /// evicts them down to the capacity. This blocks the calling thread on file-system work.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or listed.
    pub fn build(self) -> Result<DiskCache<K, V>, Error> {
        let store = Store::open(self.path, self.capacity).map_err(Error::backend)?;
        Ok(DiskCache::from_store(store))
    }
}
