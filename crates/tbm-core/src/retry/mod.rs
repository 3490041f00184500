//! Retry and backoff policy.
//!
//! This module encapsulates error classification (rate limiting, transient
//! faults, fatal failures) and backoff decisions so the bulk runner and any
//! future callers share a consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, message_is_rate_limited, status_is_rate_limited};
pub use error::MutationError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy, BREAKER_PAUSE, BREAKER_THRESHOLD};

pub(crate) use run::{attempt_item, RunCounters};
