// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::fmt::{self, Display};

/// The broad category of a cache failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The storage or fetch mechanism failed: I/O, network, encoding.
    Backend,
    /// A key or value transformation failed.
    Transform,
    /// A required value was absent.
    NotFound,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend => f.write_str("cache backend failure"),
            Self::Transform => f.write_str("cache transform failure"),
            Self::NotFound => f.write_str("value not found"),
        }
    }
}

/// An error from a cache operation.
///
/// The error carries an [`ErrorKind`] and, usually, the underlying cause. Use
/// [`std::error::Error::source()`] or [`ohno::ErrorExt::find_source`] to reach the cause.
/// Errors are clonable so a single failure can be delivered to several waiting callers.
///
/// # Example
///
/// ```
/// use strata_tier::{Error, ErrorKind};
///
/// let error = Error::backend("disk unavailable");
/// assert_eq!(error.kind(), ErrorKind::Backend);
/// ```
#[ohno::error]
#[derive(Clone)]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a [`ErrorKind::Backend`] error from any underlying cause.
    pub fn backend(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Backend, cause)
    }

    /// Creates a [`ErrorKind::Transform`] error from any underlying cause.
    pub fn transform(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Transform, cause)
    }

    /// Creates a [`ErrorKind::NotFound`] error.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
