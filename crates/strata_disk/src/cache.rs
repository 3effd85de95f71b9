// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    fmt::{Debug, Display},
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Serialize, de::DeserializeOwned};
use strata_tier::{Cache, Error};
use tokio::runtime::Handle;

use crate::{builder::DiskCacheBuilder, store::Store};

/// A file-system cache stage bounded by total size.
///
/// Each key is rendered with [`Display`] and hashed into a file name; values are encoded with
/// `bincode`. Writes are staged in a temporary file and atomically moved into place.
///
/// - `get` returns absence for a missing entry. An entry that no longer decodes is deleted
///   and reported as absence. A successful read marks the entry as recently used.
/// - `set` replaces the entry, then evicts the least recently used entries until the total
///   size fits the capacity.
/// - `clear` deletes every entry. Under a Tokio runtime the deletion runs in the background.
///
/// File-system work runs on Tokio's blocking pool when called from within a runtime, and on
/// the calling thread otherwise. Clones share the same directory and bookkeeping.
///
/// # Examples
///
/// ```
/// use strata_disk::DiskCache;
/// use strata_tier::Cache;
/// # futures::executor::block_on(async {
/// # let dir = tempfile::tempdir().unwrap();
///
/// let cache = DiskCache::<String, Vec<u8>>::builder(dir.path())
///     .capacity(1024 * 1024)
///     .build()?;
///
/// cache.set(&"key".to_string(), vec![1, 2, 3]).await?;
/// assert_eq!(cache.get(&"key".to_string()).await?, Some(vec![1, 2, 3]));
/// # Ok::<(), strata_tier::Error>(())
/// # });
/// ```
pub struct DiskCache<K, V> {
    store: Arc<Store>,
    _types: PhantomData<fn(K) -> V>,
}

impl<K, V> DiskCache<K, V> {
    /// Creates a builder for a cache stored under `path`.
    #[must_use]
    pub fn builder(path: impl Into<PathBuf>) -> DiskCacheBuilder<K, V> {
        DiskCacheBuilder::new(path)
    }

    pub(crate) fn from_store(store: Store) -> Self {
        Self {
            store: Arc::new(store),
            _types: PhantomData,
        }
    }

    /// Returns the directory the cache was built with.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.store.root()
    }

    /// Returns the total size in bytes of the stored entries.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.store.size()
    }

    /// Returns the size bound in bytes.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.store.capacity()
    }

    /// Changes the size bound, evicting entries if the cache no longer fits.
    ///
    /// # Errors
    ///
    /// Returns an error if the eviction work could not be scheduled.
    pub async fn set_capacity(&self, capacity: u64) -> Result<(), Error> {
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            store.set_capacity(capacity);
            Ok(())
        })
        .await
    }
}

impl<K: Display, V> DiskCache<K, V> {
    /// Returns the file that holds the entry for `key`, whether or not it exists.
    #[must_use]
    pub fn entry_path(&self, key: &K) -> PathBuf {
        self.store.path_for(&key.to_string())
    }
}

impl<K, V> Clone for DiskCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _types: PhantomData,
        }
    }
}

impl<K, V> Debug for DiskCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("path", &self.store.root())
            .field("size", &self.store.size())
            .field("capacity", &self.store.capacity())
            .finish()
    }
}

impl<K, V> Cache<K, V> for DiskCache<K, V>
where
    K: Display + Sync,
    V: Serialize + DeserializeOwned + Send + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let path = self.entry_path(key);
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            store
                .load(&path, |bytes| bincode::deserialize::<V>(bytes))
                .map_err(Error::backend)
        })
        .await
    }

    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        let bytes = bincode::serialize(&value).map_err(Error::backend)?;
        let path = self.entry_path(key);
        let store = Arc::clone(&self.store);
        run_blocking(move || store.write(&path, &bytes).map_err(Error::backend)).await
    }

    fn clear(&self) {
        let store = Arc::clone(&self.store);
        match Handle::try_current() {
            Ok(handle) => {
                // Detached; completion is observable through `size`.
                drop(handle.spawn_blocking(move || store.clear()));
            }
            Err(_) => store.clear(),
        }
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => handle.spawn_blocking(work).await.map_err(Error::backend)?,
        Err(_) => work(),
    }
}
