// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Composable cache pipelines.
//!
//! A cache is anything that can look up, store and forget values by key: an in-memory map,
//! a directory on disk or a read-only network source. This crate combines such caches into
//! larger ones with a small set of operators:
//!
//! - [`compose`] chains two caches so that misses fall through and hits are written back,
//! - [`reuse_in_flight`] shares concurrent lookups for the same key,
//! - [`map_values`] and [`map_keys`] adapt the value and key types, with asynchronous variants,
//! - [`expires`] stamps values with a deadline and hides them once it passes,
//! - [`skip_while`] and [`switch_cache`] route lookups at run time.
//!
//! Every operator returns another [`Cache`], so pipelines nest freely. [`CacheExt`] offers
//! the same operators as methods.
//!
//! # Examples
//!
//! ## Two-Level Cache
//!
//! ```
//! use strata::{Cache, CacheExt, RamCache};
//! # futures::executor::block_on(async {
//!
//! let l1 = RamCache::<String, i32>::new();
//! let l2 = RamCache::<String, i32>::new();
//! l2.set(&"key".to_string(), 42).await?;
//!
//! let cache = l1.clone().compose(l2);
//! assert_eq!(cache.get(&"key".to_string()).await?, Some(42));
//! # Ok::<(), strata::Error>(())
//! # });
//! ```
//!
//! ## Expiring, Deduplicated Lookups
//!
//! ```
//! use std::time::Duration;
//!
//! use strata::{Cache, CacheExt, ExpiryRecord, RamCache};
//! use tick::Clock;
//! # futures::executor::block_on(async {
//!
//! let clock = Clock::new_frozen();
//! let cache = RamCache::<u64, ExpiryRecord<String>>::new()
//!     .expires(Duration::from_secs(300), clock)
//!     .reuse_in_flight();
//!
//! cache.set(&1, "one".to_string()).await?;
//! assert_eq!(cache.get_required(&1).await?, "one");
//! # Ok::<(), strata::Error>(())
//! # });
//! ```
//!
//! # Features
//!
//! - `memory` (default): the [`RamCache`] backend.
//! - `disk`: the `DiskCache` backend.
//! - `http`: the `NetworkFetcher` source over a pluggable `HttpClient`.
//! - `reqwest`: a `reqwest`-based `HttpClient`.
//! - `test-util`: `MockCache` and friends for testing code built on caches.

mod compose;
mod expiry;
mod ext;
mod map;
mod reuse_in_flight;
mod skip_while;
mod switch;
mod telemetry;

#[doc(inline)]
pub use compose::{Compose, WriteBack, compose, compose_with};
#[doc(inline)]
pub use expiry::{Expires, Expiry, expires};
#[doc(inline)]
pub use ext::CacheExt;
#[doc(inline)]
pub use map::{FlatMapKeys, FlatMapValues, MapKeys, MapValues, flat_map_keys, flat_map_values, map_keys, map_values};
#[doc(inline)]
pub use reuse_in_flight::{ReuseInFlight, reuse_in_flight};
#[doc(inline)]
pub use skip_while::{SkipWhile, skip_while};
#[cfg(feature = "disk")]
#[doc(inline)]
pub use strata_disk::{DiskCache, DiskCacheBuilder};
#[cfg(feature = "http")]
#[doc(inline)]
pub use strata_http::{HttpClient, NetworkError, NetworkErrorKind, NetworkFetcher};
#[cfg(feature = "reqwest")]
#[doc(inline)]
pub use strata_http::ReqwestClient;
#[cfg(feature = "memory")]
#[doc(inline)]
pub use strata_memory::{RamCache, RamCacheBuilder};
#[doc(inline)]
pub use strata_tier::{Cache, CompositeCache, Error, ErrorKind, ExpiryRecord, Fetcher, FetcherCache, NormalizeExt, Result};
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use strata_tier::testing::{CacheOp, Gate, MockCache};
#[doc(inline)]
pub use switch::{CacheSwitch, Switch, switch_cache};
