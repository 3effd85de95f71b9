// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use strata_tier::{Cache, Error};

/// Which side of a [`Switch`] serves a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSwitch {
    /// The first cache.
    A,
    /// The second cache.
    B,
}

/// Two caches behind a per-key selector.
///
/// `get` and `set` evaluate the selector for the key on every call and delegate to the
/// selected cache only. `clear` clears both.
///
/// # Examples
///
/// ```
/// use strata::{Cache, CacheSwitch, RamCache, switch_cache};
/// # futures::executor::block_on(async {
///
/// let small = RamCache::<u64, String>::new();
/// let large = RamCache::<u64, String>::new();
/// let cache = switch_cache(small.clone(), large.clone(), |key: &u64| {
///     if *key < 1_000 { CacheSwitch::A } else { CacheSwitch::B }
/// });
///
/// cache.set(&5_000, "big".to_string()).await?;
/// assert_eq!(large.get(&5_000).await?, Some("big".to_string()));
/// assert_eq!(small.get(&5_000).await?, None);
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct Switch<A, B, F> {
    a: A,
    b: B,
    selector: F,
}

/// Routes each key to `a` or `b` according to `selector`.
pub fn switch_cache<A, B, F, K>(a: A, b: B, selector: F) -> Switch<A, B, F>
where
    F: Fn(&K) -> CacheSwitch,
{
    Switch { a, b, selector }
}

impl<A, B, F> Switch<A, B, F> {
    /// Returns the cache selected by [`CacheSwitch::A`].
    #[must_use]
    pub fn a(&self) -> &A {
        &self.a
    }

    /// Returns the cache selected by [`CacheSwitch::B`].
    #[must_use]
    pub fn b(&self) -> &B {
        &self.b
    }
}

impl<A: std::fmt::Debug, B: std::fmt::Debug, F> std::fmt::Debug for Switch<A, B, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("a", &self.a)
            .field("b", &self.b)
            .finish_non_exhaustive()
    }
}

impl<K, V, A, B, F> Cache<K, V> for Switch<A, B, F>
where
    K: Sync,
    V: Send,
    A: Cache<K, V>,
    B: Cache<K, V>,
    F: Fn(&K) -> CacheSwitch + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        match (self.selector)(key) {
            CacheSwitch::A => self.a.get(key).await,
            CacheSwitch::B => self.b.get(key).await,
        }
    }

    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        match (self.selector)(key) {
            CacheSwitch::A => self.a.set(key, value).await,
            CacheSwitch::B => self.b.set(key, value).await,
        }
    }

    fn clear(&self) {
        self.a.clear();
        self.b.clear();
    }
}

#[cfg(test)]
mod tests {
    use strata_tier::testing::{CacheOp, MockCache};

    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn by_parity(key: &u32) -> CacheSwitch {
        if key % 2 == 0 { CacheSwitch::A } else { CacheSwitch::B }
    }

    #[test]
    fn operations_reach_only_the_selected_side() {
        let even = MockCache::<u32, &'static str>::new();
        let odd = MockCache::<u32, &'static str>::new();
        let cache = switch_cache(even.clone(), odd.clone(), by_parity);

        block_on(cache.set(&2, "two")).unwrap();
        block_on(cache.set(&3, "three")).unwrap();
        assert_eq!(block_on(cache.get(&2)).unwrap(), Some("two"));
        assert_eq!(block_on(cache.get(&3)).unwrap(), Some("three"));

        assert_eq!(
            even.operations(),
            vec![CacheOp::Set { key: 2, value: "two" }, CacheOp::Get(2)]
        );
        assert_eq!(
            odd.operations(),
            vec![CacheOp::Set { key: 3, value: "three" }, CacheOp::Get(3)]
        );
    }

    #[test]
    fn clear_reaches_both_sides() {
        let even = MockCache::<u32, &'static str>::new();
        let odd = MockCache::<u32, &'static str>::new();
        let cache = switch_cache(even.clone(), odd.clone(), by_parity);

        Cache::<u32, &'static str>::clear(&cache);

        assert_eq!(even.operations(), vec![CacheOp::Clear]);
        assert_eq!(odd.operations(), vec![CacheOp::Clear]);
    }

    #[test]
    fn selector_is_evaluated_per_call() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let flip = std::sync::Arc::new(AtomicBool::new(false));
        let flag = std::sync::Arc::clone(&flip);
        let a = MockCache::<u32, u32>::new();
        let b = MockCache::<u32, u32>::new();
        let cache = switch_cache(a.clone(), b.clone(), move |_: &u32| {
            if flag.load(Ordering::SeqCst) { CacheSwitch::B } else { CacheSwitch::A }
        });

        block_on(cache.get(&1)).unwrap();
        flip.store(true, Ordering::SeqCst);
        block_on(cache.get(&1)).unwrap();

        assert_eq!(a.get_count(&1), 1);
        assert_eq!(b.get_count(&1), 1);
    }
}
