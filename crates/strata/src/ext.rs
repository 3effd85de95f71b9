// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fluent construction of cache pipelines.

use std::hash::Hash;

use strata_tier::{Cache, Error};
use tick::Clock;

use crate::{
    compose::{Compose, WriteBack, compose, compose_with},
    expiry::{Expires, Expiry, expires},
    map::{FlatMapKeys, FlatMapValues, MapKeys, MapValues, flat_map_keys, flat_map_values, map_keys, map_values},
    reuse_in_flight::{ReuseInFlight, reuse_in_flight},
    skip_while::{SkipWhile, skip_while},
};

/// Operators available on every [`Cache`].
///
/// Each method consumes the receiver and returns the decorated cache, so pipelines read left
/// to right. Every method is equivalent to the free function of the same name.
///
/// # Examples
///
/// ```
/// use strata::{Cache, CacheExt, RamCache};
/// # futures::executor::block_on(async {
///
/// let l1 = RamCache::<u32, String>::new();
/// let l2 = RamCache::<u32, String>::new();
/// l2.set(&7, "seven".to_string()).await?;
///
/// let pipeline = l1.clone().compose(l2).reuse_in_flight();
///
/// assert_eq!(pipeline.get_required(&7).await?, "seven");
/// assert!(pipeline.get_required(&8).await.is_err());
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub trait CacheExt<K, V>: Cache<K, V> + Sized {
    /// Puts `self` in front of `next`. See [`Compose`].
    fn compose<B>(self, next: B) -> Compose<Self, B>
    where
        B: Cache<K, V>,
    {
        compose(self, next)
    }

    /// Puts `self` in front of `next` with an explicit write-back mode. See [`Compose`].
    fn compose_with<B>(self, next: B, write_back: WriteBack) -> Compose<Self, B>
    where
        B: Cache<K, V>,
    {
        compose_with(self, next, write_back)
    }

    /// Shares concurrent lookups for the same key. See [`ReuseInFlight`].
    fn reuse_in_flight(self) -> ReuseInFlight<Self, K, V>
    where
        K: Eq + Hash,
    {
        reuse_in_flight(self)
    }

    /// Exposes values of type `W` through a fallible bijection. See [`MapValues`].
    fn map_values<W, F, G, E1, E2>(self, forward: F, inverse: G) -> MapValues<Self, F, G, V>
    where
        F: Fn(V) -> Result<W, E1>,
        G: Fn(W) -> Result<V, E2>,
    {
        map_values(self, forward, inverse)
    }

    /// Like [`map_values`](CacheExt::map_values) with asynchronous transforms.
    fn flat_map_values<W, F, FFut, G, GFut, E1, E2>(self, forward: F, inverse: G) -> FlatMapValues<Self, F, G, V>
    where
        F: Fn(V) -> FFut,
        FFut: Future<Output = Result<W, E1>>,
        G: Fn(W) -> GFut,
        GFut: Future<Output = Result<V, E2>>,
    {
        flat_map_values(self, forward, inverse)
    }

    /// Accepts keys of type `K2`, translated into this cache's keys. See [`MapKeys`].
    fn map_keys<K2, G, E>(self, map: G) -> MapKeys<Self, G, K>
    where
        G: Fn(&K2) -> Result<K, E>,
    {
        map_keys(self, map)
    }

    /// Like [`map_keys`](CacheExt::map_keys) with an asynchronous translation.
    fn flat_map_keys<K2, G, GFut, E>(self, map: G) -> FlatMapKeys<Self, G, K>
    where
        G: Fn(&K2) -> GFut,
        GFut: Future<Output = Result<K, E>>,
    {
        flat_map_keys(self, map)
    }

    /// Stamps stored values with a deadline and hides them once it passes. See [`Expires`].
    ///
    /// Applies to caches whose values are [`ExpiryRecord`](strata_tier::ExpiryRecord)s.
    fn expires(self, expiry: impl Into<Expiry>, clock: Clock) -> Expires<Self> {
        expires(self, expiry.into(), clock)
    }

    /// Bypasses lookups while `condition` resolves to `true`. See [`SkipWhile`].
    fn skip_while<F, Fut>(self, condition: F) -> SkipWhile<Self, F>
    where
        F: Fn(&K) -> Fut,
        Fut: Future<Output = bool>,
    {
        skip_while(self, condition)
    }

    /// Looks up `key` and fails with [`ErrorKind::NotFound`](strata_tier::ErrorKind::NotFound)
    /// when it is absent.
    fn get_required(&self, key: &K) -> impl Future<Output = Result<V, Error>> + Send {
        let lookup = self.get(key);
        async move { lookup.await?.ok_or_else(Error::not_found) }
    }
}

impl<K, V, C: Cache<K, V>> CacheExt<K, V> for C {}
