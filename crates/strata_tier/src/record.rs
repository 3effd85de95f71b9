// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::SystemTime;

/// A value paired with the instant after which it is no longer valid.
///
/// Caches that sit below an expiry stage store records rather than bare values. Records
/// are created when a value is stored and never mutated afterwards. With the `serde`
/// feature enabled they can be persisted by serializing backends.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use strata_tier::ExpiryRecord;
///
/// let deadline = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
/// let record = ExpiryRecord::new("data", Some(deadline));
///
/// assert!(!record.is_expired_at(deadline));
/// assert!(record.is_expired_at(deadline + Duration::from_secs(1)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpiryRecord<V> {
    value: V,
    expires_at: Option<SystemTime>,
}

impl<V> ExpiryRecord<V> {
    /// Creates a record that expires at `expires_at`, or never when `None`.
    pub fn new(value: V, expires_at: Option<SystemTime>) -> Self {
        Self { value, expires_at }
    }

    /// Creates a record that never expires.
    pub fn permanent(value: V) -> Self {
        Self::new(value, None)
    }

    /// Returns the stored value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the record, returning the stored value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the expiry instant, or `None` if the record never expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    /// Returns `true` when the expiry instant lies strictly before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|deadline| deadline < now)
    }
}
