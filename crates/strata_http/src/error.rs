// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display};

use http::StatusCode;

/// What went wrong while fetching a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NetworkErrorKind {
    /// The server answered with a status outside `200..300`.
    StatusCodeNotOk(StatusCode),
    /// The body is shorter than the declared `Content-Length`.
    InvalidResponse {
        /// The declared length.
        expected: u64,
        /// The length actually received.
        received: u64,
    },
    /// The request could not be sent or its response could not be read.
    Transport,
}

impl Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusCodeNotOk(status) => write!(f, "unexpected status code {status}"),
            Self::InvalidResponse { expected, received } => {
                write!(f, "expected {expected} bytes but received {received}")
            }
            Self::Transport => f.write_str("transport failure"),
        }
    }
}

/// A failed fetch.
///
/// Fetch failures reach callers as [`strata_tier::Error`]s of kind
/// [`Backend`](strata_tier::ErrorKind::Backend) with a `NetworkError` as their source:
///
/// ```
/// use http::StatusCode;
/// use ohno::ErrorExt;
/// use strata_http::{NetworkError, NetworkErrorKind};
///
/// let error = strata_tier::Error::backend(NetworkError::status_code_not_ok(StatusCode::NOT_FOUND));
///
/// let network = error.find_source::<NetworkError>().unwrap();
/// assert_eq!(network.kind(), NetworkErrorKind::StatusCodeNotOk(StatusCode::NOT_FOUND));
/// ```
#[ohno::error]
#[display("{kind}")]
pub struct NetworkError {
    kind: NetworkErrorKind,
}

impl NetworkError {
    /// The server answered with `status`.
    #[must_use]
    pub fn status_code_not_ok(status: StatusCode) -> Self {
        Self::new(NetworkErrorKind::StatusCodeNotOk(status))
    }

    /// The body was cut short.
    #[must_use]
    pub fn invalid_response(expected: u64, received: u64) -> Self {
        Self::new(NetworkErrorKind::InvalidResponse { expected, received })
    }

    /// The transport failed with `cause`.
    pub fn transport(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(NetworkErrorKind::Transport, cause)
    }

    /// Returns what went wrong.
    #[must_use]
    pub fn kind(&self) -> NetworkErrorKind {
        self.kind
    }
}
