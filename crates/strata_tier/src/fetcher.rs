// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-only sources and their adaptation into caches.

use crate::{Cache, Error};

/// A read-only source of values, such as a remote service.
///
/// A fetcher can only produce values. Convert it with [`Fetcher::into_cache`] to use it as
/// the last stage of a pipeline; writes and clears on the resulting cache are no-ops.
pub trait Fetcher<K, V>: Send + Sync {
    /// Retrieves the value for `key`, or `None` if the source has nothing for it.
    fn fetch(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Adapts this fetcher into a [`Cache`].
    fn into_cache(self) -> FetcherCache<Self>
    where
        Self: Sized,
    {
        FetcherCache(self)
    }
}

/// A [`Cache`] backed by a [`Fetcher`].
///
/// `get` fetches, `set` succeeds without storing anything and `clear` does nothing.
#[derive(Debug, Clone)]
pub struct FetcherCache<F>(F);

impl<F> FetcherCache<F> {
    /// Returns the wrapped fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.0
    }
}

impl<K, V, F> Cache<K, V> for FetcherCache<F>
where
    K: Sync,
    V: Send,
    F: Fetcher<K, V>,
{
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send {
        self.0.fetch(key)
    }

    async fn set(&self, _key: &K, _value: V) -> Result<(), Error> {
        Ok(())
    }

    fn clear(&self) {}
}
