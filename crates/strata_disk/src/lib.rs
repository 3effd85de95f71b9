// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! File-system cache stage.
//!
//! [`DiskCache`] stores one file per key under a directory and keeps the directory within a
//! byte budget by evicting the least recently used entries. Values are encoded with
//! `bincode`, so any `serde` value can be stored, including
//! [`ExpiryRecord`](strata_tier::ExpiryRecord) with the `serde` feature of `strata_tier`.
//!
//! # Layout
//!
//! ```text
//! <path>/entries/<sha256 of key>   one file per entry
//! <path>/staging/tmp*              writes in progress
//! ```
//!
//! Entries left behind by an earlier process are picked up when the cache is built.

mod builder;
mod cache;
mod store;

#[doc(inline)]
pub use builder::{DEFAULT_CAPACITY, DiskCacheBuilder};
#[doc(inline)]
pub use cache::DiskCache;
