// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type-erased caches built from closures or from other caches.

use std::{any::Any, fmt::Debug, sync::Arc};

use crate::{Cache, Error, cache::DynCache};

/// Extension trait for erasing any [`Cache`] into a [`CompositeCache`].
///
/// This trait is automatically implemented for all types that implement `Cache`.
///
/// # Examples
///
/// ```
/// use strata_tier::{Cache, CompositeCache, NormalizeExt};
///
/// fn erase<C>(cache: C) -> CompositeCache<String, i32>
/// where
///     C: Cache<String, i32> + 'static,
/// {
///     cache.normalize()
/// }
/// ```
pub trait NormalizeExt<K, V>: Sized {
    /// Converts this cache into a `CompositeCache`.
    ///
    /// Normalizing a `CompositeCache` returns it unchanged.
    fn normalize(self) -> CompositeCache<K, V>;
}

impl<K, V, C> NormalizeExt<K, V> for C
where
    K: 'static,
    V: 'static,
    C: Cache<K, V> + 'static,
{
    fn normalize(self) -> CompositeCache<K, V> {
        CompositeCache::from_cache(self)
    }
}

/// A clonable cache with type erasure.
///
/// `CompositeCache` is the common currency of heterogeneous pipelines: every cache, however
/// deeply composed, can be turned into one, and one can be built directly from three
/// behaviors. Clones share the same underlying cache.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use std::sync::{Arc, Mutex};
///
/// use strata_tier::{Cache, CompositeCache, Error};
///
/// let store = Arc::new(Mutex::new(HashMap::<String, i32>::new()));
/// let (get_store, set_store, clear_store) = (store.clone(), store.clone(), store);
///
/// let cache = CompositeCache::new(
///     move |key: String| {
///         let value = get_store.lock().unwrap().get(&key).copied();
///         async move { Ok::<_, Error>(value) }
///     },
///     move |key: String, value: i32| {
///         set_store.lock().unwrap().insert(key, value);
///         async { Ok::<_, Error>(()) }
///     },
///     move || clear_store.lock().unwrap().clear(),
/// );
///
/// # futures::executor::block_on(async {
/// cache.set(&"answer".to_string(), 42).await.unwrap();
/// assert_eq!(cache.get(&"answer".to_string()).await.unwrap(), Some(42));
/// # });
/// ```
pub struct CompositeCache<K, V>(Arc<DynCache<'static, K, V>>);

impl<K, V> CompositeCache<K, V>
where
    K: 'static,
    V: 'static,
{
    /// Creates a cache from its three behaviors.
    ///
    /// `get` receives an owned key and resolves to the value or absence, `set` receives an
    /// owned key and value, and `clear` purges whatever the behaviors store.
    pub fn new<G, GetFut, S, SetFut, C>(get: G, set: S, clear: C) -> Self
    where
        K: Clone + Send + Sync,
        V: Send,
        G: Fn(K) -> GetFut + Send + Sync + 'static,
        GetFut: Future<Output = Result<Option<V>, Error>> + Send + 'static,
        S: Fn(K, V) -> SetFut + Send + Sync + 'static,
        SetFut: Future<Output = Result<(), Error>> + Send + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        Self(DynCache::new_arc(FnCache { get, set, clear }))
    }

    /// Erases `cache` into a `CompositeCache`.
    ///
    /// A `CompositeCache` passed in is returned as is rather than wrapped again.
    pub fn from_cache<C>(cache: C) -> Self
    where
        C: Cache<K, V> + 'static,
    {
        match (&cache as &dyn Any).downcast_ref::<Self>() {
            Some(same) => same.clone(),
            None => Self(DynCache::new_arc(cache)),
        }
    }

    /// Returns `true` if both handles share the same underlying cache.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<K, V> Debug for CompositeCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeCache").finish_non_exhaustive()
    }
}

impl<K, V> Clone for CompositeCache<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> Cache<K, V> for CompositeCache<K, V>
where
    K: Sync,
    V: Send,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        self.0.get(key).await
    }

    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        self.0.set(key, value).await
    }

    fn clear(&self) {
        self.0.clear();
    }
}

struct FnCache<G, S, C> {
    get: G,
    set: S,
    clear: C,
}

impl<K, V, G, GetFut, S, SetFut, C> Cache<K, V> for FnCache<G, S, C>
where
    K: Clone,
    G: Fn(K) -> GetFut + Send + Sync,
    GetFut: Future<Output = Result<Option<V>, Error>> + Send,
    S: Fn(K, V) -> SetFut + Send + Sync,
    SetFut: Future<Output = Result<(), Error>> + Send,
    C: Fn() + Send + Sync,
{
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send {
        (self.get)(key.clone())
    }

    fn set(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send {
        (self.set)(key.clone(), value)
    }

    fn clear(&self) {
        (self.clear)();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::executor::block_on;

    use super::*;
    use crate::{ErrorKind, testing::MockCache};

    #[test]
    fn closures_back_every_operation() {
        let clears = Arc::new(AtomicUsize::new(0));
        let clears_in_cache = Arc::clone(&clears);
        let cache = CompositeCache::new(
            |key: u32| async move { Ok::<_, Error>(Some(key * 2)) },
            |_key: u32, value: u32| async move {
                if value == 0 {
                    Err(Error::backend("zero"))
                } else {
                    Ok(())
                }
            },
            move || {
                clears_in_cache.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert_eq!(block_on(cache.get(&21)).unwrap(), Some(42));
        block_on(cache.set(&1, 1)).unwrap();
        let err = block_on(cache.set(&1, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);

        cache.clear();
        assert_eq!(clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn from_cache_delegates() {
        let mock = MockCache::<String, i32>::new();
        let cache = mock.clone().normalize();

        block_on(cache.set(&"a".to_string(), 1)).unwrap();
        assert_eq!(block_on(cache.get(&"a".to_string())).unwrap(), Some(1));
        assert!(mock.contains_key(&"a".to_string()));

        cache.clear();
        assert_eq!(mock.entry_count(), 0);
    }

    #[test]
    fn normalizing_a_composite_does_not_wrap_again() {
        let cache = MockCache::<String, i32>::new().normalize();
        let again = cache.clone().normalize();
        assert!(cache.ptr_eq(&again));
    }

    #[test]
    fn clones_share_the_cache() {
        let cache = MockCache::<String, i32>::new().normalize();
        let clone = cache.clone();
        block_on(clone.set(&"k".to_string(), 7)).unwrap();
        assert_eq!(block_on(cache.get(&"k".to_string())).unwrap(), Some(7));
    }

    #[test]
    fn debug_output() {
        let cache = MockCache::<String, i32>::new().normalize();
        assert!(format!("{cache:?}").contains("CompositeCache"));
    }
}
