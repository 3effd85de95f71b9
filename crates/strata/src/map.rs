// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Key and value transformations.
//!
//! These adapters let a cache of one shape stand in for a cache of another: values are
//! converted on the way out and back on the way in, keys are converted before every call.
//! A failing transformation surfaces as an [`ErrorKind::Transform`](strata_tier::ErrorKind::Transform)
//! error and the wrapped cache is not called for the failed operation.

use std::{error::Error as StdError, marker::PhantomData};

use strata_tier::{Cache, Error};

type BoxError = Box<dyn StdError + Send + Sync>;

/// A cache whose values are converted with synchronous functions.
///
/// `get` applies `forward` to a present value. `set` applies `inverse` and stores the
/// result. Absence passes through without calling `forward`.
///
/// # Examples
///
/// ```
/// use strata::{Cache, CacheExt, RamCache};
/// # futures::executor::block_on(async {
///
/// let cache = RamCache::<String, String>::new().map_values(
///     |text: String| text.parse::<i64>(),
///     |number: i64| Ok::<_, std::convert::Infallible>(number.to_string()),
/// );
///
/// cache.set(&"answer".to_string(), 42).await?;
/// assert_eq!(cache.get(&"answer".to_string()).await?, Some(42));
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct MapValues<C, F, G, V> {
    inner: C,
    forward: F,
    inverse: G,
    _value: PhantomData<fn() -> V>,
}

/// Converts the values of `cache` with `forward` and `inverse`.
pub fn map_values<C, F, G, V, W, E1, E2>(cache: C, forward: F, inverse: G) -> MapValues<C, F, G, V>
where
    F: Fn(V) -> Result<W, E1>,
    G: Fn(W) -> Result<V, E2>,
{
    MapValues {
        inner: cache,
        forward,
        inverse,
        _value: PhantomData,
    }
}

impl<K, V, W, C, F, G, E1, E2> Cache<K, W> for MapValues<C, F, G, V>
where
    K: Sync,
    V: Send,
    W: Send,
    C: Cache<K, V>,
    F: Fn(V) -> Result<W, E1> + Send + Sync,
    G: Fn(W) -> Result<V, E2> + Send + Sync,
    E1: Into<BoxError>,
    E2: Into<BoxError>,
{
    async fn get(&self, key: &K) -> Result<Option<W>, Error> {
        self.inner
            .get(key)
            .await?
            .map(|value| (self.forward)(value).map_err(Error::transform))
            .transpose()
    }

    async fn set(&self, key: &K, value: W) -> Result<(), Error> {
        let stored = (self.inverse)(value).map_err(Error::transform)?;
        self.inner.set(key, stored).await
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

/// A cache whose values are converted with asynchronous functions.
///
/// Behaves like [`MapValues`] with transformations that may suspend, such as decoding on a
/// worker pool.
pub struct FlatMapValues<C, F, G, V> {
    inner: C,
    forward: F,
    inverse: G,
    _value: PhantomData<fn() -> V>,
}

/// Converts the values of `cache` with the asynchronous `forward` and `inverse`.
pub fn flat_map_values<C, F, FFut, G, GFut, V, W, E1, E2>(cache: C, forward: F, inverse: G) -> FlatMapValues<C, F, G, V>
where
    F: Fn(V) -> FFut,
    FFut: Future<Output = Result<W, E1>>,
    G: Fn(W) -> GFut,
    GFut: Future<Output = Result<V, E2>>,
{
    FlatMapValues {
        inner: cache,
        forward,
        inverse,
        _value: PhantomData,
    }
}

impl<K, V, W, C, F, FFut, G, GFut, E1, E2> Cache<K, W> for FlatMapValues<C, F, G, V>
where
    K: Sync,
    V: Send,
    W: Send,
    C: Cache<K, V>,
    F: Fn(V) -> FFut + Send + Sync,
    FFut: Future<Output = Result<W, E1>> + Send,
    G: Fn(W) -> GFut + Send + Sync,
    GFut: Future<Output = Result<V, E2>> + Send,
    E1: Into<BoxError>,
    E2: Into<BoxError>,
{
    async fn get(&self, key: &K) -> Result<Option<W>, Error> {
        match self.inner.get(key).await? {
            Some(value) => (self.forward)(value).await.map(Some).map_err(Error::transform),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &K, value: W) -> Result<(), Error> {
        let stored = (self.inverse)(value).await.map_err(Error::transform)?;
        self.inner.set(key, stored).await
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

/// A cache addressed with a different key type.
///
/// Every `get` and `set` converts the caller's key with `map` first. `K` is the key type of
/// the wrapped cache.
///
/// # Examples
///
/// ```
/// use strata::{Cache, CacheExt, RamCache};
/// # futures::executor::block_on(async {
///
/// let cache = RamCache::<u64, String>::new().map_keys(|id: &String| id.parse::<u64>());
///
/// cache.set(&"7".to_string(), "seven".to_string()).await?;
/// assert_eq!(cache.get(&"7".to_string()).await?, Some("seven".to_string()));
/// assert!(cache.get(&"seven".to_string()).await.is_err());
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct MapKeys<C, G, K> {
    inner: C,
    map: G,
    _key: PhantomData<fn() -> K>,
}

/// Addresses `cache` through keys converted with `map`.
pub fn map_keys<C, G, K, K2, E>(cache: C, map: G) -> MapKeys<C, G, K>
where
    G: Fn(&K2) -> Result<K, E>,
{
    MapKeys {
        inner: cache,
        map,
        _key: PhantomData,
    }
}

impl<K, K2, V, C, G, E> Cache<K2, V> for MapKeys<C, G, K>
where
    K: Send + Sync,
    K2: Sync,
    V: Send,
    C: Cache<K, V>,
    G: Fn(&K2) -> Result<K, E> + Send + Sync,
    E: Into<BoxError>,
{
    async fn get(&self, key: &K2) -> Result<Option<V>, Error> {
        let key = (self.map)(key).map_err(Error::transform)?;
        self.inner.get(&key).await
    }

    async fn set(&self, key: &K2, value: V) -> Result<(), Error> {
        let key = (self.map)(key).map_err(Error::transform)?;
        self.inner.set(&key, value).await
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

/// A cache addressed with a different key type, converted asynchronously.
pub struct FlatMapKeys<C, G, K> {
    inner: C,
    map: G,
    _key: PhantomData<fn() -> K>,
}

/// Addresses `cache` through keys converted with the asynchronous `map`.
pub fn flat_map_keys<C, G, GFut, K, K2, E>(cache: C, map: G) -> FlatMapKeys<C, G, K>
where
    G: Fn(&K2) -> GFut,
    GFut: Future<Output = Result<K, E>>,
{
    FlatMapKeys {
        inner: cache,
        map,
        _key: PhantomData,
    }
}

impl<K, K2, V, C, G, GFut, E> Cache<K2, V> for FlatMapKeys<C, G, K>
where
    K: Send + Sync,
    K2: Sync,
    V: Send,
    C: Cache<K, V>,
    G: Fn(&K2) -> GFut + Send + Sync,
    GFut: Future<Output = Result<K, E>> + Send,
    E: Into<BoxError>,
{
    async fn get(&self, key: &K2) -> Result<Option<V>, Error> {
        let key = (self.map)(key).await.map_err(Error::transform)?;
        self.inner.get(&key).await
    }

    async fn set(&self, key: &K2, value: V) -> Result<(), Error> {
        let key = (self.map)(key).await.map_err(Error::transform)?;
        self.inner.set(&key, value).await
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

macro_rules! impl_inner_accessors {
    ($($ty:ident<$($param:ident),+>),+ $(,)?) => {
        $(
            impl<$($param),+> $ty<$($param),+> {
                /// Returns the wrapped cache.
                #[must_use]
                pub fn inner(&self) -> &C {
                    &self.inner
                }
            }

            impl<$($param),+> std::fmt::Debug for $ty<$($param),+>
            where
                C: std::fmt::Debug,
            {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.debug_struct(stringify!($ty)).field("inner", &self.inner).finish_non_exhaustive()
                }
            }
        )+
    };
}

impl_inner_accessors!(MapValues<C, F, G, V>, FlatMapValues<C, F, G, V>, MapKeys<C, G, K>, FlatMapKeys<C, G, K>);

#[cfg(test)]
mod tests {
    use std::num::ParseIntError;

    use strata_tier::{
        ErrorKind,
        testing::{CacheOp, MockCache},
    };

    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn parse(text: String) -> Result<i32, ParseIntError> {
        text.parse()
    }

    fn render(number: i32) -> Result<String, std::convert::Infallible> {
        Ok(number.to_string())
    }

    #[test]
    fn absence_skips_forward() {
        let forward = |_: String| -> Result<i32, ParseIntError> { panic!("forward must not run on absence") };
        let cache = map_values(MockCache::<u8, String>::new(), forward, render);
        assert_eq!(block_on(cache.get(&1)).unwrap(), None);
    }

    #[test]
    fn forward_failure_is_a_transform_error() {
        let mock = MockCache::<u8, String>::new();
        block_on(mock.set(&1, "not a number".to_string())).unwrap();
        let cache = map_values(mock, parse, render);

        let err = block_on(cache.get(&1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transform);
    }

    #[test]
    fn inverse_failure_does_not_reach_the_inner_cache() {
        let mock = MockCache::<u8, i32>::new();
        let cache = map_values(
            mock.clone(),
            |n: i32| Ok::<_, std::convert::Infallible>(n.to_string()),
            |text: String| text.parse::<i32>(),
        );

        let err = block_on(cache.set(&1, "x".to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transform);
        assert!(mock.operations().is_empty());
    }

    #[test]
    fn flat_map_values_round_trip() {
        let mock = MockCache::<u8, String>::new();
        let cache = flat_map_values(
            mock.clone(),
            |text: String| async move { text.parse::<i32>() },
            |number: i32| async move { Ok::<_, std::convert::Infallible>(format!("{number}")) },
        );

        block_on(cache.set(&1, 17)).unwrap();
        assert_eq!(mock.peek(&1), Some("17".to_string()));
        assert_eq!(block_on(cache.get(&1)).unwrap(), Some(17));
        assert_eq!(block_on(cache.get(&2)).unwrap(), None);
    }

    #[test]
    fn map_keys_failure_does_not_reach_the_inner_cache() {
        let mock = MockCache::<u32, &'static str>::new();
        let cache = map_keys(mock.clone(), |key: &String| key.parse::<u32>());

        assert_eq!(block_on(cache.get(&"nope".to_string())).unwrap_err().kind(), ErrorKind::Transform);
        assert_eq!(
            block_on(cache.set(&"nope".to_string(), "v")).unwrap_err().kind(),
            ErrorKind::Transform
        );
        assert!(mock.operations().is_empty());

        block_on(cache.set(&"5".to_string(), "five")).unwrap();
        assert_eq!(mock.operations(), vec![CacheOp::Set { key: 5, value: "five" }]);
    }

    #[test]
    fn flat_map_keys_converts_before_every_call() {
        let mock = MockCache::<u32, &'static str>::new();
        let cache = flat_map_keys(mock.clone(), |key: &String| {
            let parsed = key.parse::<u32>();
            async move { parsed }
        });

        block_on(cache.set(&"3".to_string(), "three")).unwrap();
        assert_eq!(block_on(cache.get(&"3".to_string())).unwrap(), Some("three"));
        assert_eq!(block_on(cache.get(&"x".to_string())).unwrap_err().kind(), ErrorKind::Transform);
        assert_eq!(mock.get_count(&3), 1);
    }

    #[test]
    fn clear_delegates() {
        let mock = MockCache::<u8, String>::new();
        block_on(mock.set(&1, "1".to_string())).unwrap();
        let cache = map_values(mock.clone(), parse, render);

        Cache::<u8, i32>::clear(&cache);
        assert_eq!(mock.entry_count(), 0);
    }
}
