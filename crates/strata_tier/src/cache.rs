// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The capability shared by every cache and every stage of a pipeline.

use std::sync::Arc;

use crate::Error;

/// An asynchronous key-value source.
///
/// Implement this trait for storage backends. Operators in the `strata` crate wrap
/// implementations of this trait and implement it themselves, so pipelines of any depth
/// expose the same interface.
///
/// - `get` resolves to `Ok(None)` when the key is absent. Absence is never an error.
/// - `set` stores the association and fails only when persistence fails.
/// - `clear` is a synchronous, best-effort purge that does not report failures.
#[cfg_attr(
    any(test, feature = "dynamic-cache"),
    dynosaur::dynosaur(pub(crate) DynCache = dyn(box) Cache, bridge(none))
)]
pub trait Cache<K, V>: Send + Sync {
    /// Looks up the value stored under `key`.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Stores `value` under `key`.
    fn set(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes every entry.
    fn clear(&self);
}

impl<K, V, C> Cache<K, V> for Arc<C>
where
    C: Cache<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).set(key, value)
    }

    fn clear(&self) {
        (**self).clear();
    }
}
