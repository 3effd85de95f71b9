// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory cache stage backed by moka.
//!
//! [`RamCache`] is a concurrent map with optional entry-count bounds. Configure it with
//! [`RamCacheBuilder`]; moka's types never appear in the public API.
//!
//! # Quick Start
//!
//! ```
//! use strata_memory::RamCacheBuilder;
//! use strata_tier::Cache;
//!
//! # futures::executor::block_on(async {
//! let cache = RamCacheBuilder::<String, i32>::new()
//!     .max_capacity(1000)
//!     .build();
//!
//! cache.set(&"key".to_string(), 42).await?;
//! assert_eq!(cache.get(&"key".to_string()).await?, Some(42));
//! # Ok::<(), strata_tier::Error>(())
//! # });
//! ```

pub mod builder;
pub mod cache;

#[doc(inline)]
pub use builder::RamCacheBuilder;
#[doc(inline)]
pub use cache::RamCache;
