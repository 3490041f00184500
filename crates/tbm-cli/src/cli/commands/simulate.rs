//! `tbm simulate` – exercise the pacing engine against a flaky operation.

use anyhow::Result;
use tokio::sync::mpsc;

use tbm_core::pacing::{DelayTuning, Thresholds};
use tbm_core::retry::{MutationError, RetryPolicy};
use tbm_core::runner::{run_batch, RunHooks, RunOptions};

/// Knobs for one simulation run.
#[derive(Debug, Clone, Copy)]
pub struct SimulateArgs {
    pub items: usize,
    /// First attempt of every Nth item hits a rate limit.
    pub rate_limit_every: Option<usize>,
    /// First attempt of every Nth item hits a transient fault.
    pub transient_every: Option<usize>,
    /// This item fails every attempt and exhausts its retries.
    pub fail_at: Option<usize>,
    pub keep_going: bool,
    pub floor_ms: u64,
    pub start_ms: u64,
    pub peak_ms: u64,
}

fn hits_every(every: Option<usize>, index: usize) -> bool {
    matches!(every, Some(n) if n > 0 && (index + 1) % n == 0)
}

pub async fn run_simulate(args: SimulateArgs) -> Result<()> {
    let opts = RunOptions {
        stop_on_failure: !args.keep_going,
        tuning: DelayTuning {
            floor_ms: args.floor_ms,
            start_ms: args.start_ms,
            peak_ms: args.peak_ms,
        },
        retry: RetryPolicy::default(),
    };

    let (thresholds_tx, mut thresholds_rx) = mpsc::channel::<Option<Thresholds>>(256);
    let hooks = RunHooks {
        progress: None,
        delay: None,
        thresholds: Some(thresholds_tx),
    };

    // Deterministic failure injection: the attempt counter resets per item,
    // so injected errors hit the first attempt only and the retry succeeds.
    let mut attempt: (usize, u32) = (usize::MAX, 0);
    let op = move |i: usize, _item: usize| {
        if attempt.0 != i {
            attempt = (i, 0);
        }
        attempt.1 += 1;
        let first = attempt.1 == 1;
        let outcome = if args.fail_at == Some(i) {
            Err(MutationError::Network(format!(
                "injected persistent fault for item {}",
                i
            )))
        } else if first && hits_every(args.rate_limit_every, i) {
            Err(MutationError::Api {
                status: Some(429),
                message: "Rate limit exceeded".into(),
            })
        } else if first && hits_every(args.transient_every, i) {
            Err(MutationError::Network("injected transient fault".into()))
        } else {
            Ok(i)
        };
        async move { outcome }
    };

    println!("Simulating {} item(s)...", args.items);
    let items: Vec<usize> = (0..args.items).collect();
    let outcome = run_batch(items, op, &opts, &hooks).await;
    drop(hooks);

    let mut learned = None;
    while let Ok(snapshot) = thresholds_rx.try_recv() {
        if snapshot.is_some() {
            learned = snapshot;
        }
    }

    println!(
        "Run {}: {} succeeded, {} failed.",
        outcome.disposition(),
        outcome.successful.len(),
        outcome.failed.len()
    );
    println!(
        "  rate-limit hits: {}  transient retries: {}  breaker pauses: {}",
        outcome.stats.rate_limit_hits,
        outcome.stats.transient_retries,
        outcome.stats.breaker_pauses
    );
    if let Some(t) = learned {
        println!(
            "  learned bounds: floor {} ms  sustainable {} ms  average {} ms  peak {} ms",
            t.floor_ms, t.sustainable_ms, t.average_ms, t.peak_ms
        );
        println!("Recommended inter-request delay: {} ms", t.sustainable_ms);
    }
    Ok(())
}
