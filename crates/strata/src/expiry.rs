// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Time-bounded values.
//!
//! [`Expires`] stamps every stored value with a deadline computed from an [`Expiry`] policy
//! and hides values whose deadline has passed. The wrapped cache stores [`ExpiryRecord`]s.

use std::time::{Duration, SystemTime};

use strata_tier::{Cache, Error, ExpiryRecord};
use tick::Clock;

use crate::telemetry::{self, Activity, Operator};

/// When a stored value stops being valid.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use strata::Expiry;
///
/// let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
///
/// assert_eq!(Expiry::Never.deadline(now), None);
/// assert_eq!(
///     Expiry::After(Duration::from_secs(10)).deadline(now),
///     Some(now + Duration::from_secs(10))
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Values never expire.
    Never,
    /// Values expire this long after they were stored.
    After(Duration),
    /// Values expire at this instant, whenever they were stored.
    At(SystemTime),
}

impl Expiry {
    /// Returns the deadline for a value stored at `now`, or `None` if it never expires.
    ///
    /// A relative expiry that overflows the representable time range never expires.
    #[must_use]
    pub fn deadline(&self, now: SystemTime) -> Option<SystemTime> {
        match *self {
            Self::Never => None,
            Self::After(duration) => now.checked_add(duration),
            Self::At(instant) => Some(instant),
        }
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Self::After(duration)
    }
}

impl From<SystemTime> for Expiry {
    fn from(instant: SystemTime) -> Self {
        Self::At(instant)
    }
}

/// A cache decorator that expires values lazily.
///
/// - `set` computes the deadline from the policy and the clock at call time and stores the
///   value together with it.
/// - `get` returns absence for a record whose deadline lies strictly before the current time.
///   Expired records are not deleted; a later `set` overwrites them.
/// - `clear` delegates.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use strata::{Cache, CacheExt, Expiry, ExpiryRecord, RamCache};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let clock = Clock::new_frozen();
/// let cache = RamCache::<String, ExpiryRecord<i32>>::new()
///     .expires(Expiry::After(Duration::from_secs(60)), clock);
///
/// cache.set(&"key".to_string(), 1).await?;
/// assert_eq!(cache.get(&"key".to_string()).await?, Some(1));
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Expires<C> {
    inner: C,
    expiry: Expiry,
    clock: Clock,
}

/// Stores values in `cache` with deadlines computed from `expiry` and `clock`.
pub fn expires<C>(cache: C, expiry: Expiry, clock: Clock) -> Expires<C> {
    Expires {
        inner: cache,
        expiry,
        clock,
    }
}

impl<C> Expires<C> {
    /// Returns the wrapped cache.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Returns the expiry policy.
    #[must_use]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }
}

impl<K, V, C> Cache<K, V> for Expires<C>
where
    K: Sync,
    V: Send,
    C: Cache<K, ExpiryRecord<V>>,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let Some(record) = self.inner.get(key).await? else {
            return Ok(None);
        };

        if record.is_expired_at(self.clock.system_time()) {
            telemetry::emit(Operator::Expires, Activity::Expired);
            return Ok(None);
        }
        Ok(Some(record.into_value()))
    }

    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        let deadline = self.expiry.deadline(self.clock.system_time());
        self.inner.set(key, ExpiryRecord::new(value, deadline)).await
    }

    fn clear(&self) {
        self.inner.clear();
    }
}
