// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Chaining two caches with read-through and write-back.
//!
//! [`Compose`] consults its first cache and falls through to the second one on a miss. A value
//! found in the second cache is written back into the first one so that later lookups hit
//! early. Writes go to both caches.

use std::sync::Arc;

use futures::join;
use strata_tier::{Cache, Error};
use tokio::runtime::Handle;

use crate::telemetry::{self, Activity, Operator};

/// How [`Compose`] writes a value found in its second cache back into its first cache.
///
/// Write-back failures never affect the value returned to the caller; they are logged at
/// `warn` level.
///
/// # Examples
///
/// ```
/// use strata::{CacheExt, RamCache, WriteBack};
///
/// let l1 = RamCache::<String, i32>::new();
/// let l2 = RamCache::<String, i32>::new();
///
/// // The lookup completes only after the first cache has been updated.
/// let cache = l1.compose_with(l2, WriteBack::Awaited);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteBack {
    /// Spawns the write-back onto the current Tokio runtime and returns the value without
    /// waiting for it. Outside of a Tokio runtime the write-back is awaited instead.
    #[default]
    Detached,
    /// Awaits the write-back before returning the value.
    Awaited,
}

#[derive(Debug)]
struct ComposeInner<A, B> {
    first: A,
    second: B,
}

/// Two caches chained with read-through and write-back.
///
/// - `get` consults the first cache. On a hit the second cache is not touched. On a miss the
///   second cache is consulted and a hit there is written back into the first cache according
///   to the [`WriteBack`] policy. An error from the first cache is returned immediately.
/// - `set` writes to both caches concurrently. Both writes are always attempted and the first
///   failure is reported.
/// - `clear` clears both caches.
///
/// Construct this with [`compose`], [`compose_with`] or [`CacheExt::compose`](crate::CacheExt::compose).
/// Composition is associative: nesting on either side consults stages in the same order and
/// writes a hit back into every stage before it.
///
/// # Examples
///
/// ```
/// use strata::{Cache, CacheExt, RamCache, WriteBack};
/// # futures::executor::block_on(async {
///
/// let l1 = RamCache::<String, i32>::new();
/// let l2 = RamCache::<String, i32>::new();
/// l2.set(&"key".to_string(), 42).await?;
///
/// let cache = l1.clone().compose_with(l2, WriteBack::Awaited);
/// assert_eq!(cache.get(&"key".to_string()).await?, Some(42));
/// assert_eq!(l1.get(&"key".to_string()).await?, Some(42));
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
#[derive(Debug)]
pub struct Compose<A, B> {
    inner: Arc<ComposeInner<A, B>>,
    write_back: WriteBack,
}

/// Chains `first` and `second` with detached write-back.
pub fn compose<A, B>(first: A, second: B) -> Compose<A, B> {
    compose_with(first, second, WriteBack::default())
}

/// Chains `first` and `second` with the given write-back policy.
pub fn compose_with<A, B>(first: A, second: B, write_back: WriteBack) -> Compose<A, B> {
    Compose {
        inner: Arc::new(ComposeInner { first, second }),
        write_back,
    }
}

impl<A, B> Compose<A, B> {
    /// Returns the cache consulted first.
    #[must_use]
    pub fn first(&self) -> &A {
        &self.inner.first
    }

    /// Returns the cache consulted on a miss.
    #[must_use]
    pub fn second(&self) -> &B {
        &self.inner.second
    }

    /// Returns the write-back policy.
    #[must_use]
    pub fn write_back(&self) -> WriteBack {
        self.write_back
    }
}

impl<A, B> Clone for Compose<A, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            write_back: self.write_back,
        }
    }
}

impl<A, B> Compose<A, B> {
    /// Handles the second stage when the first one misses. Only this path is boxed.
    async fn get_from_second<K, V>(&self, key: &K) -> Result<Option<V>, Error>
    where
        K: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        A: Cache<K, V> + 'static,
        B: Cache<K, V> + 'static,
    {
        telemetry::emit(Operator::Compose, Activity::Fallthrough);
        let Some(value) = self.inner.second.get(key).await? else {
            return Ok(None);
        };

        self.promote(key, value.clone()).await;
        Ok(Some(value))
    }

    async fn promote<K, V>(&self, key: &K, value: V)
    where
        K: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        A: Cache<K, V> + 'static,
        B: Cache<K, V> + 'static,
    {
        telemetry::emit(Operator::Compose, Activity::WriteBack);

        let runtime = match self.write_back {
            WriteBack::Detached => Handle::try_current().ok(),
            WriteBack::Awaited => None,
        };

        match runtime {
            Some(runtime) => {
                let inner = Arc::clone(&self.inner);
                let key = key.clone();
                // Fire-and-forget: the join handle is dropped.
                drop(runtime.spawn(async move {
                    if let Err(error) = inner.first.set(&key, value).await {
                        telemetry::emit_failure(Operator::Compose, Activity::WriteBackFailed, &error);
                    }
                }));
            }
            None => {
                if let Err(error) = self.inner.first.set(key, value).await {
                    telemetry::emit_failure(Operator::Compose, Activity::WriteBackFailed, &error);
                }
            }
        }
    }
}

impl<K, V, A, B> Cache<K, V> for Compose<A, B>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    A: Cache<K, V> + 'static,
    B: Cache<K, V> + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        if let Some(value) = self.inner.first.get(key).await? {
            return Ok(Some(value));
        }

        // Boxed to bound future size for deeply nested pipelines.
        Box::pin(self.get_from_second(key)).await
    }

    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        let (first_result, second_result) = join!(
            Box::pin(self.inner.first.set(key, value.clone())),
            Box::pin(self.inner.second.set(key, value))
        );
        first_result?;
        second_result
    }

    fn clear(&self) {
        self.inner.first.clear();
        self.inner.second.clear();
    }
}

/// Unit tests for write-back and logging details.
///
/// Public API tests are in `tests/compose.rs`.
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use strata_tier::testing::{CacheOp, MockCache};

    use super::*;
    use crate::telemetry::testing::LogCapture;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn seeded(key: &str, value: i32) -> MockCache<String, i32> {
        let cache = MockCache::new();
        block_on(cache.set(&key.to_string(), value)).unwrap();
        cache.clear_operations();
        cache
    }

    #[test]
    fn detached_without_runtime_writes_back_inline() {
        let first = MockCache::<String, i32>::new();
        let cache = compose(first.clone(), seeded("key", 42));

        let value = block_on(cache.get(&"key".to_string())).unwrap();

        assert_eq!(value, Some(42));
        assert_eq!(first.peek(&"key".to_string()), Some(42));
    }

    #[tokio::test]
    async fn detached_write_back_is_spawned() {
        let first = MockCache::<String, i32>::new();
        let cache = compose(first.clone(), seeded("key", 42));

        assert_eq!(cache.get(&"key".to_string()).await.unwrap(), Some(42));

        for _ in 0..100 {
            if first.contains_key(&"key".to_string()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(first.peek(&"key".to_string()), Some(42));
    }

    #[test]
    fn failed_write_back_is_logged_and_ignored() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let first = MockCache::<String, i32>::new();
        first.fail_when(|op| matches!(op, CacheOp::Set { .. }));
        let cache = compose_with(first, seeded("key", 7), WriteBack::Awaited);

        assert_eq!(block_on(cache.get(&"key".to_string())).unwrap(), Some(7));
        capture.assert_contains("write_back_failed");
        capture.assert_contains("WARN");
    }

    #[test]
    fn fallthrough_is_logged() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let cache = compose_with(MockCache::<String, i32>::new(), MockCache::new(), WriteBack::Awaited);
        assert_eq!(block_on(cache.get(&"missing".to_string())).unwrap(), None);

        assert_eq!(capture.count(Activity::Fallthrough), 1);
        assert_eq!(capture.count(Activity::WriteBack), 0);
    }

    #[test]
    fn accessors_expose_stages() {
        let cache = compose_with(seeded("a", 1), seeded("b", 2), WriteBack::Awaited);
        assert_eq!(cache.first().peek(&"a".to_string()), Some(1));
        assert_eq!(cache.second().peek(&"b".to_string()), Some(2));
        assert_eq!(cache.write_back(), WriteBack::Awaited);
        assert_eq!(compose(seeded("a", 1), seeded("b", 2)).write_back(), WriteBack::Detached);
    }
}
