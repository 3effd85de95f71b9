// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bytes::Bytes;
use http::{Request, Response};
use strata_tier::Error;

/// Sends HTTP requests on behalf of a [`NetworkFetcher`](crate::NetworkFetcher).
///
/// Implementations return the complete response, body included, and report transport
/// failures as errors. They do not interpret the status code. Dropping the returned future
/// must abandon the request.
pub trait HttpClient: Send + Sync {
    /// Sends `request` and collects the response.
    fn execute(&self, request: &Request<()>) -> impl Future<Output = Result<Response<Bytes>, Error>> + Send;
}

#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;

#[cfg(feature = "reqwest")]
mod reqwest_client {
    use super::*;
    use crate::NetworkError;

    /// An [`HttpClient`] backed by [`reqwest::Client`].
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Creates a client with reqwest's default configuration.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Wraps an existing, pre-configured client.
        #[must_use]
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl HttpClient for ReqwestClient {
        async fn execute(&self, request: &Request<()>) -> Result<Response<Bytes>, Error> {
            let response = self
                .client
                .request(request.method().clone(), request.uri().to_string())
                .headers(request.headers().clone())
                .send()
                .await
                .map_err(|e| Error::backend(NetworkError::transport(e)))?;

            let status = response.status();
            let version = response.version();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::backend(NetworkError::transport(e)))?;

            let mut collected = Response::new(body);
            *collected.status_mut() = status;
            *collected.version_mut() = version;
            *collected.headers_mut() = headers;
            Ok(collected)
        }
    }
}
