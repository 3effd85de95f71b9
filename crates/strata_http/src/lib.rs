// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Read-only HTTP source.
//!
//! [`NetworkFetcher`] implements [`Fetcher`](strata_tier::Fetcher) for `http::Request<()>`
//! keys and `Bytes` values, sending requests through an [`HttpClient`]. Enable the default
//! `reqwest` feature for [`ReqwestClient`], or implement [`HttpClient`] over any other
//! client.
//!
//! # Examples
//!
//! ```
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use strata_http::{HttpClient, NetworkFetcher};
//! use strata_tier::{Cache, Error, Fetcher};
//!
//! struct Canned;
//!
//! impl HttpClient for Canned {
//!     async fn execute(&self, _request: &Request<()>) -> Result<Response<Bytes>, Error> {
//!         Ok(Response::new(Bytes::from_static(b"hello")))
//!     }
//! }
//!
//! # futures::executor::block_on(async {
//! let network = NetworkFetcher::new(Canned).into_cache();
//! let request = Request::get("https://example.com/greeting").body(()).unwrap();
//!
//! assert_eq!(network.get(&request).await?, Some(Bytes::from_static(b"hello")));
//! # Ok::<(), Error>(())
//! # });
//! ```

mod client;
mod error;
mod fetcher;

#[cfg(feature = "reqwest")]
#[doc(inline)]
pub use client::ReqwestClient;
#[doc(inline)]
pub use client::HttpClient;
#[doc(inline)]
pub use error::{NetworkError, NetworkErrorKind};
#[doc(inline)]
pub use fetcher::NetworkFetcher;
