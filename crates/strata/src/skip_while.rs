// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use strata_tier::{Cache, Error};

use crate::telemetry::{self, Activity, Operator};

/// A cache decorator that bypasses lookups while a condition holds.
///
/// `get` evaluates the condition for the key first. When it resolves to `true` the lookup
/// returns absence without consulting the wrapped cache. `set` and `clear` always delegate.
///
/// Placed in front of the network stage of a pipeline, this turns lookups into misses while
/// the device is offline.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// use strata::{Cache, CacheExt, RamCache};
/// # futures::executor::block_on(async {
///
/// let offline = Arc::new(AtomicBool::new(true));
/// let flag = Arc::clone(&offline);
/// let cache = RamCache::<String, i32>::new().skip_while(move |_key: &String| {
///     let skip = flag.load(Ordering::SeqCst);
///     async move { skip }
/// });
///
/// cache.set(&"key".to_string(), 1).await?;
/// assert_eq!(cache.get(&"key".to_string()).await?, None);
///
/// offline.store(false, Ordering::SeqCst);
/// assert_eq!(cache.get(&"key".to_string()).await?, Some(1));
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct SkipWhile<C, F> {
    inner: C,
    condition: F,
}

/// Bypasses lookups on `cache` while `condition` resolves to `true`.
pub fn skip_while<C, F, Fut, K>(cache: C, condition: F) -> SkipWhile<C, F>
where
    F: Fn(&K) -> Fut,
    Fut: Future<Output = bool>,
{
    SkipWhile { inner: cache, condition }
}

impl<C, F> SkipWhile<C, F> {
    /// Returns the wrapped cache.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: std::fmt::Debug, F> std::fmt::Debug for SkipWhile<C, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipWhile").field("inner", &self.inner).finish_non_exhaustive()
    }
}

impl<K, V, C, F, Fut> Cache<K, V> for SkipWhile<C, F>
where
    K: Sync,
    V: Send,
    C: Cache<K, V>,
    F: Fn(&K) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        if (self.condition)(key).await {
            telemetry::emit(Operator::SkipWhile, Activity::Skipped);
            return Ok(None);
        }
        self.inner.get(key).await
    }

    fn set(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send {
        self.inner.set(key, value)
    }

    fn clear(&self) {
        self.inner.clear();
    }
}
