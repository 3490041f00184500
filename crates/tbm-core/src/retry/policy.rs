use std::time::Duration;

/// High-level classification of a mutation error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server asked us to slow down (429/403 or a rate-limit message).
    /// Retried indefinitely; never exhausts the retry budget.
    RateLimited,
    /// Anything that may clear up on its own. Retried up to the cap.
    Transient,
    /// Not retryable (e.g. task missing from a required snapshot).
    Fatal,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Base pause before re-attempting a rate-limited call, in milliseconds.
const RATE_LIMIT_BASE_MS: u64 = 1000;
/// Added per consecutive rate-limit hit.
const RATE_LIMIT_STEP_MS: u64 = 1000;
/// Upper bound on the rate-limit pause.
const RATE_LIMIT_CAP_MS: u64 = 10_000;

/// Consecutive failures of any kind that trip the circuit breaker.
pub const BREAKER_THRESHOLD: u32 = 5;
/// How long the whole run pauses when the breaker trips.
pub const BREAKER_PAUSE: Duration = Duration::from_millis(5000);

/// Retry policy for one bulk run.
///
/// Rate-limited errors are retried without limit; `max_retries` bounds
/// transient errors only. Fatal errors are never retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Transient failures allowed per item before it is recorded as failed.
    pub max_retries: u32,
    /// Base delay for transient exponential backoff.
    pub transient_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            transient_base: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the next attempt after `attempts` transient failures
    /// of the same item. `attempts` is the post-increment count, so the
    /// first retry waits `transient_base * 2`.
    pub fn transient_backoff(&self, attempts: u32) -> Duration {
        let exp = 1u32 << attempts.min(10);
        self.transient_base.saturating_mul(exp)
    }

    /// Out-of-band pause after `consecutive_hits` rate-limit errors with no
    /// intervening success: `1000 + 1000 * hits` ms, capped at 10 s. This is
    /// separate from the per-item delay owned by the pacing controller.
    pub fn rate_limit_backoff(&self, consecutive_hits: u32) -> Duration {
        let ms = RATE_LIMIT_BASE_MS
            .saturating_add(RATE_LIMIT_STEP_MS.saturating_mul(u64::from(consecutive_hits)))
            .min(RATE_LIMIT_CAP_MS);
        Duration::from_millis(ms)
    }

    /// Decide whether to retry after a classified failure.
    ///
    /// Both counters are post-increment: `transient_attempts` counts this
    /// item's transient failures including the one just observed, and
    /// `consecutive_rate_limit_hits` counts run-wide rate-limit hits since
    /// the last success.
    pub fn decide(
        &self,
        kind: ErrorKind,
        transient_attempts: u32,
        consecutive_rate_limit_hits: u32,
    ) -> RetryDecision {
        match kind {
            ErrorKind::Fatal => RetryDecision::NoRetry,
            ErrorKind::RateLimited => {
                RetryDecision::RetryAfter(self.rate_limit_backoff(consecutive_rate_limit_hits))
            }
            ErrorKind::Transient => {
                if transient_attempts >= self.max_retries {
                    RetryDecision::NoRetry
                } else {
                    RetryDecision::RetryAfter(self.transient_backoff(transient_attempts))
                }
            }
        }
    }
}
