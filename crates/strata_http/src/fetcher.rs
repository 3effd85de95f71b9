// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bytes::Bytes;
use http::{Request, Response, header::CONTENT_LENGTH};
use strata_tier::{Error, Fetcher};

use crate::{HttpClient, NetworkError};

/// A read-only source that fetches resources over HTTP.
///
/// The key is the request to send; the value is the response body. A fetch never yields
/// absence. It fails with a [`NetworkError`] cause when:
///
/// - the status is outside `200..300`,
/// - the body is shorter than the declared `Content-Length`,
/// - the client could not complete the exchange.
///
/// # Examples
///
/// ```no_run
/// use http::Request;
/// use strata_http::NetworkFetcher;
/// use strata_tier::{Cache, Fetcher};
/// # futures::executor::block_on(async {
///
/// let network = NetworkFetcher::reqwest().into_cache();
/// let request = Request::get("https://example.com/logo.png").body(()).unwrap();
///
/// let logo = network.get(&request).await?;
/// # Ok::<(), strata_tier::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct NetworkFetcher<C> {
    client: C,
}

impl<C: HttpClient> NetworkFetcher<C> {
    /// Creates a fetcher that sends requests through `client`.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns the client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }
}

#[cfg(feature = "reqwest")]
impl NetworkFetcher<crate::ReqwestClient> {
    /// Creates a fetcher over a default [`ReqwestClient`](crate::ReqwestClient).
    #[must_use]
    pub fn reqwest() -> Self {
        Self::new(crate::ReqwestClient::new())
    }
}

impl<C: HttpClient> Fetcher<Request<()>, Bytes> for NetworkFetcher<C> {
    async fn fetch(&self, request: &Request<()>) -> Result<Option<Bytes>, Error> {
        let response = self.client.execute(request).await?;
        validate(response).map(Some).map_err(|error| {
            tracing::debug!(http.uri = %request.uri(), cache.error = %error, "cache.fetch_rejected");
            Error::backend(error)
        })
    }
}

fn validate(response: Response<Bytes>) -> Result<Bytes, NetworkError> {
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::status_code_not_ok(status));
    }

    let declared = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    let body = response.into_body();
    let received = body.len() as u64;
    match declared {
        Some(expected) if received < expected => Err(NetworkError::invalid_response(expected, received)),
        _ => Ok(body),
    }
}
