// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured events emitted by the operators.
//!
//! Every event carries the operator that produced it and what happened. Field names are
//! stable so that subscribers can filter on them.

use strata_tier::Error;

#[cfg(test)]
pub(crate) mod testing;

/// The operator that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Compose,
    ReuseInFlight,
    Expires,
    SkipWhile,
}

impl Operator {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Compose => "compose",
            Self::ReuseInFlight => "reuse_in_flight",
            Self::Expires => "expires",
            Self::SkipWhile => "skip_while",
        }
    }
}

/// What happened inside an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activity {
    /// The first stage missed and the second one is consulted.
    Fallthrough,
    /// A value found downstream is written back upstream.
    WriteBack,
    /// A write-back failed. The value was still returned.
    WriteBackFailed,
    /// A caller joined a request already in flight.
    Joined,
    /// An in-flight request was removed from the registry.
    Retired,
    /// A stored record was past its deadline.
    Expired,
    /// A lookup was answered with absence without consulting the wrapped cache.
    Skipped,
}

impl Activity {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Fallthrough => "fallthrough",
            Self::WriteBack => "write_back",
            Self::WriteBackFailed => "write_back_failed",
            Self::Joined => "joined",
            Self::Retired => "retired",
            Self::Expired => "expired",
            Self::Skipped => "skipped",
        }
    }
}

/// Emits a debug event for routine operator activity.
pub(crate) fn emit(operator: Operator, activity: Activity) {
    tracing::debug!(
        cache.operator = operator.as_str(),
        cache.activity = activity.as_str(),
        "cache.event"
    );
}

/// Emits a warning for a failure that the operator absorbed.
pub(crate) fn emit_failure(operator: Operator, activity: Activity, error: &Error) {
    tracing::warn!(
        cache.operator = operator.as_str(),
        cache.activity = activity.as_str(),
        cache.error = %error,
        "cache.event"
    );
}
