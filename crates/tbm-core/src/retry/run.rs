//! Per-item attempt loop: classify failures and retry per policy.

use std::future::Future;

use tokio::time::sleep;

use super::classify::classify;
use super::error::MutationError;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy, BREAKER_PAUSE, BREAKER_THRESHOLD};
use crate::pacing::DelayController;

/// Failure counters carried across every item of one bulk run.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RunCounters {
    /// Failures of any kind since the last success; trips the breaker.
    pub(crate) consecutive_failures: u32,
    /// Rate-limit hits since the last success; sizes the out-of-band pause.
    pub(crate) consecutive_rate_limit_hits: u32,
    pub(crate) rate_limit_hits: u32,
    pub(crate) transient_retries: u32,
    pub(crate) breaker_pauses: u32,
}

impl RunCounters {
    fn note_success(&mut self) {
        self.consecutive_failures = 0;
        self.consecutive_rate_limit_hits = 0;
    }
}

/// Drive one item to success or abandonment.
///
/// Rate-limited failures retry without limit, feed the pacing controller, and
/// sleep a growing out-of-band pause. Transient failures retry with
/// exponential backoff until the policy cap. Fatal failures return
/// immediately. The operation is re-invoked with a fresh clone of the item on
/// every attempt.
pub(crate) async fn attempt_item<I, R, F, Fut>(
    index: usize,
    item: &I,
    op: &mut F,
    policy: &RetryPolicy,
    pacer: &mut DelayController,
    counters: &mut RunCounters,
) -> Result<R, MutationError>
where
    I: Clone,
    F: FnMut(usize, I) -> Fut,
    Fut: Future<Output = Result<R, MutationError>>,
{
    let mut transient_attempts = 0u32;
    loop {
        match op(index, item.clone()).await {
            Ok(response) => {
                counters.note_success();
                pacer.on_success();
                return Ok(response);
            }
            Err(e) => {
                counters.consecutive_failures += 1;
                if counters.consecutive_failures >= BREAKER_THRESHOLD {
                    tracing::warn!(
                        index,
                        streak = counters.consecutive_failures,
                        "failure streak tripped the breaker, pausing run for {:?}",
                        BREAKER_PAUSE
                    );
                    sleep(BREAKER_PAUSE).await;
                    counters.consecutive_failures = 0;
                    counters.breaker_pauses += 1;
                }

                let kind = classify(&e);
                match kind {
                    ErrorKind::RateLimited => {
                        counters.consecutive_rate_limit_hits += 1;
                        counters.rate_limit_hits += 1;
                        pacer.on_rate_limit();
                    }
                    ErrorKind::Transient => {
                        transient_attempts += 1;
                    }
                    ErrorKind::Fatal => {}
                }

                match policy.decide(kind, transient_attempts, counters.consecutive_rate_limit_hits)
                {
                    RetryDecision::NoRetry => {
                        tracing::debug!(index, kind = ?kind, "abandoning item: {}", e);
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(backoff) => {
                        if kind == ErrorKind::Transient {
                            counters.transient_retries += 1;
                        }
                        tracing::debug!(
                            index,
                            kind = ?kind,
                            "attempt failed ({}), retrying after {:?}",
                            e,
                            backoff
                        );
                        sleep(backoff).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::DelayTuning;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited() -> MutationError {
        MutationError::Api {
            status: Some(429),
            message: "Rate limit exceeded".into(),
        }
    }

    fn transient() -> MutationError {
        MutationError::Network("connection reset".into())
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_abandon_after_six_calls() {
        let calls = AtomicU32::new(0);
        let mut op = |_i: usize, _item: ()| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(transient()) }
        };
        let policy = RetryPolicy::default();
        let mut pacer = DelayController::new(DelayTuning::default());
        let mut counters = RunCounters::default();

        let out = attempt_item(0, &(), &mut op, &policy, &mut pacer, &mut counters).await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(counters.transient_retries, 5);
        // Delay math untouched by transient failures.
        assert_eq!(pacer.state().current_ms, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_never_exhaust() {
        let calls = AtomicU32::new(0);
        let mut op = |_i: usize, _item: ()| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 10 {
                    Err(rate_limited())
                } else {
                    Ok(n)
                }
            }
        };
        let policy = RetryPolicy::default();
        let mut pacer = DelayController::new(DelayTuning::default());
        let mut counters = RunCounters::default();

        let out = attempt_item(0, &(), &mut op, &policy, &mut pacer, &mut counters).await;
        assert_eq!(out.unwrap(), 10);
        assert_eq!(counters.rate_limit_hits, 10);
        // Reset by the success at the end.
        assert_eq!(counters.consecutive_rate_limit_hits, 0);
        assert_eq!(counters.consecutive_failures, 0);
        assert_eq!(counters.transient_retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_fails_on_first_call() {
        let calls = AtomicU32::new(0);
        let mut op = |_i: usize, _item: ()| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(MutationError::MissingSnapshot { id: "t-9".into() }) }
        };
        let policy = RetryPolicy::default();
        let mut pacer = DelayController::new(DelayTuning::default());
        let mut counters = RunCounters::default();

        let out = attempt_item(0, &(), &mut op, &policy, &mut pacer, &mut counters).await;
        assert!(matches!(out, Err(MutationError::MissingSnapshot { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_pause_recorded_on_long_streak() {
        let calls = AtomicU32::new(0);
        let mut op = |_i: usize, _item: ()| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(transient()) }
        };
        let policy = RetryPolicy::default();
        let mut pacer = DelayController::new(DelayTuning::default());
        let mut counters = RunCounters::default();

        let _ = attempt_item(0, &(), &mut op, &policy, &mut pacer, &mut counters).await;
        // Six failures in a row: the fifth trips the breaker once.
        assert_eq!(counters.breaker_pauses, 1);
        assert_eq!(counters.consecutive_failures, 1);
    }
}
