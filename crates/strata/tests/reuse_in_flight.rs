// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for in-flight request sharing.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use strata::{Cache, CacheExt, Error, ErrorKind, reuse_in_flight};
use strata_tier::testing::{CacheOp, Gate, MockCache};

type TestResult = Result<(), Error>;

/// Answers every lookup with `key * 10` after a per-key delay, counting lookups.
#[derive(Clone)]
struct SlowCache {
    lookups: Arc<AtomicUsize>,
    delay: fn(&u32) -> Duration,
}

impl SlowCache {
    fn new(delay: fn(&u32) -> Duration) -> Self {
        Self {
            lookups: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Cache<u32, u32> for SlowCache {
    async fn get(&self, key: &u32) -> Result<Option<u32>, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep((self.delay)(key)).await;
        Ok(Some(key * 10))
    }

    async fn set(&self, _key: &u32, _value: u32) -> Result<(), Error> {
        Ok(())
    }

    fn clear(&self) {}
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn concurrent_callers_share_one_lookup() -> TestResult {
    let gate = Gate::new();
    let mock = MockCache::<u32, u32>::new().with_gate(gate.clone());
    mock.set(&1, 100).await?;
    let cache = reuse_in_flight(mock.clone());

    let callers: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&1).await })
        })
        .collect();
    settle().await;

    assert_eq!(cache.in_flight(), 1);
    assert_eq!(mock.get_count(&1), 1);

    gate.open();
    for caller in callers {
        assert_eq!(caller.await.expect("caller panicked")?, Some(100));
    }

    assert_eq!(mock.get_count(&1), 1);
    assert_eq!(cache.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_callers_share_one_failure() {
    let gate = Gate::new();
    let mock = MockCache::<u32, u32>::new().with_gate(gate.clone());
    mock.fail_when(|op| matches!(op, CacheOp::Get(_)));
    let cache = reuse_in_flight(mock.clone());

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&1).await })
        })
        .collect();
    settle().await;
    gate.open();

    for caller in callers {
        let error = caller.await.expect("caller panicked").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Backend);
    }
    assert_eq!(mock.get_count(&1), 1);
    assert_eq!(cache.in_flight(), 0);
}

#[tokio::test]
async fn next_lookup_after_failure_starts_fresh() -> TestResult {
    let mock = MockCache::<u32, u32>::new();
    mock.set(&1, 5).await?;
    mock.fail_when(|op| matches!(op, CacheOp::Get(_)));
    let cache = reuse_in_flight(mock.clone());

    assert!(cache.get(&1).await.is_err());

    mock.clear_failures();
    assert_eq!(cache.get(&1).await?, Some(5));
    assert_eq!(mock.get_count(&1), 2);
    Ok(())
}

#[tokio::test]
async fn abandoned_lookup_is_retired() -> TestResult {
    let gate = Gate::new();
    let mock = MockCache::<u32, u32>::new().with_gate(gate.clone());
    let cache = reuse_in_flight(mock.clone());

    let caller = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&1).await })
    };
    settle().await;
    assert!(cache.is_in_flight(&1));

    caller.abort();
    assert!(caller.await.is_err_and(|e| e.is_cancelled()));
    assert_eq!(cache.in_flight(), 0);

    // A later lookup issues a new request instead of waiting on the abandoned one.
    mock.remove_gate();
    assert_eq!(cache.get(&1).await?, None);
    assert_eq!(mock.get_count(&1), 2);
    Ok(())
}

#[tokio::test]
async fn timed_out_lookup_is_retired() {
    let gate = Gate::new();
    let cache = reuse_in_flight(MockCache::<u32, u32>::new().with_gate(gate));

    let outcome = tokio::time::timeout(Duration::from_millis(10), cache.get(&1)).await;

    assert!(outcome.is_err());
    assert_eq!(cache.in_flight(), 0);
}

#[tokio::test]
async fn one_abandoned_caller_does_not_cancel_the_rest() -> TestResult {
    let gate = Gate::new();
    let mock = MockCache::<u32, u32>::new().with_gate(gate.clone());
    mock.set(&1, 7).await?;
    let cache = reuse_in_flight(mock.clone());

    let quitter = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&1).await })
    };
    let stayer = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&1).await })
    };
    settle().await;

    quitter.abort();
    settle().await;
    assert!(cache.is_in_flight(&1));

    gate.open();
    assert_eq!(stayer.await.expect("caller panicked")?, Some(7));
    assert_eq!(mock.get_count(&1), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn late_caller_joins_request_in_progress() -> TestResult {
    let slow = SlowCache::new(|_| Duration::from_millis(100));
    let cache = slow.clone().reuse_in_flight();

    let early = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&1).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let late = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&1).await })
    };

    assert_eq!(early.await.expect("caller panicked")?, Some(10));
    assert_eq!(late.await.expect("caller panicked")?, Some(10));
    assert_eq!(slow.lookups(), 1);
    assert_eq!(cache.in_flight(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn different_keys_do_not_wait_on_each_other() -> TestResult {
    let slow = SlowCache::new(|key| if *key == 1 { Duration::from_secs(60) } else { Duration::from_millis(1) });
    let cache = slow.clone().reuse_in_flight();

    let stuck = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&1).await })
    };
    settle().await;

    let start = tokio::time::Instant::now();
    assert_eq!(cache.get(&2).await?, Some(20));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(cache.is_in_flight(&1));
    assert!(!cache.is_in_flight(&2));

    assert_eq!(stuck.await.expect("caller panicked")?, Some(10));
    assert_eq!(slow.lookups(), 2);
    Ok(())
}

#[tokio::test]
async fn sequential_lookups_are_not_shared() -> TestResult {
    let mock = MockCache::<u32, u32>::new();
    let cache = reuse_in_flight(mock.clone());

    cache.get(&1).await?;
    cache.get(&1).await?;

    assert_eq!(mock.get_count(&1), 2);
    Ok(())
}

#[tokio::test]
async fn set_and_clear_pass_through() -> TestResult {
    let mock = MockCache::<u32, u32>::new();
    let cache = reuse_in_flight(mock.clone());

    cache.set(&1, 2).await?;
    assert_eq!(mock.peek(&1), Some(2));

    Cache::<u32, u32>::clear(&cache);
    assert_eq!(mock.entry_count(), 0);
    assert_eq!(cache.in_flight(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn racing_threads_share_one_lookup() -> TestResult {
    const CALLERS: usize = 32;

    for _ in 0..50 {
        let gate = Gate::new();
        let mock = MockCache::<u32, u32>::new();
        mock.set(&7, 70).await?;
        let mock = mock.with_gate(gate.clone());
        let cache = reuse_in_flight(mock.clone());

        let start = Arc::new(tokio::sync::Barrier::new(CALLERS));
        let arrived = Arc::new(AtomicUsize::new(0));
        let callers: Vec<_> = (0..CALLERS)
            .map(|_| {
                let cache = cache.clone();
                let start = Arc::clone(&start);
                let arrived = Arc::clone(&arrived);
                tokio::spawn(async move {
                    start.wait().await;
                    arrived.fetch_add(1, Ordering::SeqCst);
                    cache.get(&7).await
                })
            })
            .collect();

        while arrived.load(Ordering::SeqCst) < CALLERS {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.open();

        for caller in callers {
            assert_eq!(caller.await.expect("caller panicked")?, Some(70));
        }
        assert_eq!(mock.get_count(&7), 1);
        assert_eq!(cache.in_flight(), 0);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn abandoning_callers_never_strand_a_registration() -> TestResult {
    let source = SlowCache::new(|_| Duration::from_millis(2));
    let cache = reuse_in_flight(source.clone());

    for _ in 0..200 {
        let impatient: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { tokio::time::timeout(Duration::from_millis(1), cache.get(&3)).await })
            })
            .collect();
        let patient: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get(&3).await })
            })
            .collect();

        for caller in impatient {
            if let Ok(value) = caller.await.expect("caller panicked") {
                assert_eq!(value?, Some(30));
            }
        }
        for caller in patient {
            assert_eq!(caller.await.expect("caller panicked")?, Some(30));
        }
        assert_eq!(cache.in_flight(), 0);
    }
    assert!(source.lookups() >= 1);
    Ok(())
}
