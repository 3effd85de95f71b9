// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core abstractions for composable cache pipelines.
//!
//! This crate defines the [`Cache`] trait that every stage of a pipeline satisfies, the
//! read-only [`Fetcher`] trait, [`ExpiryRecord`] for time-bounded values and the [`Error`]
//! type shared by all fallible operations.
//!
//! # Overview
//!
//! A cache is anything that can asynchronously look up a value by key, store a value under a
//! key and purge its contents. Absence is a normal outcome of [`Cache::get`], never an error.
//! Storage backends implement [`Cache`]; the `strata` crate provides the operators that chain,
//! transform and decorate them.
//!
//! # Implementing a Cache
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! use strata_tier::{Cache, Error};
//!
//! struct SimpleCache<K, V>(Mutex<HashMap<K, V>>);
//!
//! impl<K, V> Cache<K, V> for SimpleCache<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync,
//!     V: Clone + Send + Sync,
//! {
//!     async fn get(&self, key: &K) -> Result<Option<V>, Error> {
//!         Ok(self.0.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn set(&self, key: &K, value: V) -> Result<(), Error> {
//!         self.0.lock().unwrap().insert(key.clone(), value);
//!         Ok(())
//!     }
//!
//!     fn clear(&self) {
//!         self.0.lock().unwrap().clear();
//!     }
//! }
//! ```
//!
//! # Type Erasure
//!
//! Enable the `dynamic-cache` feature (on by default) for [`CompositeCache`], a clonable
//! cache built either from three closures or from any existing cache via
//! [`NormalizeExt::normalize`].

mod cache;
pub mod error;
mod fetcher;
mod record;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[cfg(any(test, feature = "dynamic-cache"))]
mod composite;

#[doc(inline)]
pub use cache::Cache;
#[cfg(any(test, feature = "dynamic-cache"))]
#[doc(inline)]
pub use composite::{CompositeCache, NormalizeExt};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use fetcher::{Fetcher, FetcherCache};
#[doc(inline)]
pub use record::ExpiryRecord;
