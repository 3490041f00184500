//! Sequential bulk driver.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::pacing::{DelayController, DelayTuning};
use crate::retry::{attempt_item, MutationError, RetryPolicy, RunCounters};

use super::outcome::{BulkOutcome, ItemFailure, ItemSuccess, RunStats};
use super::telemetry::{BulkProgress, RunHooks};

/// Options for one bulk run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Abort the run at the first unrecoverable item failure.
    pub stop_on_failure: bool,
    pub tuning: DelayTuning,
    pub retry: RetryPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stop_on_failure: true,
            tuning: DelayTuning::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Run every item through the retry loop, strictly in input order, one at a
/// time. Sequential on purpose: the delay model attributes each outcome to
/// the delay that preceded it, which concurrent calls would scramble.
///
/// Never returns an error. Per-item failures land in the outcome's `failed`
/// list or stop the run under `stop_on_failure`; the only way out of the
/// whole run is exhausting the queue or that stop. Observers on `hooks` see
/// the initial delay once, a tick per resolved item, and an idle signal
/// (zero delay, `None` thresholds) when the run ends either way.
pub async fn run_batch<I, R, F, Fut>(
    items: Vec<I>,
    mut op: F,
    opts: &RunOptions,
    hooks: &RunHooks,
) -> BulkOutcome<I, R>
where
    I: Clone,
    F: FnMut(usize, I) -> Fut,
    Fut: Future<Output = Result<R, MutationError>>,
{
    let total = items.len();
    let mut outcome = BulkOutcome::with_capacity(total);
    let mut pacer = DelayController::with_observers(
        opts.tuning,
        hooks.delay.clone(),
        hooks.thresholds.clone(),
    );
    pacer.announce();
    let mut counters = RunCounters::default();

    tracing::info!(total, stop_on_failure = opts.stop_on_failure, "bulk run started");

    for (index, item) in items.into_iter().enumerate() {
        let result =
            attempt_item(index, &item, &mut op, &opts.retry, &mut pacer, &mut counters).await;
        match result {
            Ok(response) => outcome.successful.push(ItemSuccess { item, response }),
            Err(error) => {
                tracing::warn!(index, "item failed: {}", error);
                outcome.failed.push(ItemFailure { item, error });
                if opts.stop_on_failure {
                    outcome.stopped = true;
                    break;
                }
            }
        }

        hooks.send_progress(BulkProgress {
            completed: outcome.completed(),
            total,
            thresholds: pacer.thresholds(),
        });
        if outcome.completed() < total {
            sleep(pacer.current_delay()).await;
        }
    }

    outcome.stats = RunStats {
        rate_limit_hits: counters.rate_limit_hits,
        transient_retries: counters.transient_retries,
        breaker_pauses: counters.breaker_pauses,
    };
    hooks.send_delay(Duration::ZERO);
    hooks.send_thresholds(None);
    tracing::info!(
        successful = outcome.successful.len(),
        failed = outcome.failed.len(),
        stopped = outcome.stopped,
        "bulk run finished"
    );
    outcome
}
