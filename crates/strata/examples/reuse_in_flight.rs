// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Request Sharing Example
//!
//! Ten tasks ask a slow source for the same key at the same time. Wrapped in
//! `reuse_in_flight`, the source is asked once and every task receives the shared answer.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use strata::{Cache, CacheExt, Error, RamCache};

/// A slow read-only source that counts its lookups.
#[derive(Debug, Clone)]
struct SlowSource {
    lookups: Arc<AtomicU32>,
    latency: Duration,
}

impl SlowSource {
    fn new(latency: Duration) -> Self {
        Self {
            lookups: Arc::new(AtomicU32::new(0)),
            latency,
        }
    }

    fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl Cache<String, String> for SlowSource {
    async fn get(&self, key: &String) -> Result<Option<String>, Error> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency).await;
        Ok(Some(format!("value_for_{key}")))
    }

    async fn set(&self, _key: &String, _value: String) -> Result<(), Error> {
        Ok(())
    }

    fn clear(&self) {}
}

async fn hammer<C>(cache: &C, tasks: usize)
where
    C: Cache<String, String> + Clone + 'static,
{
    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&"contested_key".to_string()).await })
        })
        .collect();

    for handle in handles {
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value.as_deref(), Some("value_for_contested_key"));
    }
}

#[tokio::main]
async fn main() {
    let latency = Duration::from_millis(100);

    // Without sharing: one lookup per task.
    let source = SlowSource::new(latency);
    hammer(&source, 10).await;
    assert_eq!(source.lookups(), 10);

    // With sharing: the first task starts the lookup, the others join it.
    let source = SlowSource::new(latency);
    let shared = source.clone().reuse_in_flight();
    hammer(&shared, 10).await;
    assert_eq!(source.lookups(), 1);

    // Behind a memory stage, later lookups never reach the source at all.
    let source = SlowSource::new(latency);
    let pipeline = RamCache::<String, String>::new().compose(source.clone()).reuse_in_flight();
    hammer(&pipeline, 10).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    hammer(&pipeline, 10).await;
    assert_eq!(source.lookups(), 1);
}
