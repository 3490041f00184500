//! `tbm run` – execute a batch of task mutations against the API.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

use tbm_core::batch::{read_batch, Mutation};
use tbm_core::config::TbmConfig;
use tbm_core::retry::MutationError;
use tbm_core::runner::{merge_fields, run_batch, BulkProgress, RunDisposition, RunHooks, SnapshotIndex};

use crate::api::TasksApi;
use crate::cli::commands::summary;

pub async fn run_bulk(
    cfg: &TbmConfig,
    batch_path: &Path,
    keep_going: bool,
    default_list: Option<&str>,
) -> Result<()> {
    let mutations = read_batch(batch_path)?;
    if mutations.is_empty() {
        println!("Batch is empty; nothing to do.");
        return Ok(());
    }

    let token = std::env::var(&cfg.token_env)
        .with_context(|| format!("read API token from ${}", cfg.token_env))?;
    let api = TasksApi::new(cfg.api_base_url.clone(), token)?;

    // Updates need the full current representation, so fetch the snapshot
    // once up front; its failure aborts the whole command.
    let has_updates = mutations
        .iter()
        .any(|m| matches!(m, Mutation::Update { .. }));
    let snapshot = if has_updates {
        let tasks = api
            .list_tasks()
            .await
            .context("prefetch task snapshot for updates")?;
        let index = SnapshotIndex::build(tasks);
        tracing::debug!(entries = index.len(), "task snapshot fetched");
        index
    } else {
        SnapshotIndex::default()
    };

    let mut opts = cfg.run_options();
    if keep_going {
        opts.stop_on_failure = false;
    }

    let (progress_tx, progress_rx) = mpsc::channel::<BulkProgress>(32);
    let (delay_tx, delay_rx) = mpsc::channel::<Duration>(32);
    let hooks = RunHooks {
        progress: Some(progress_tx),
        delay: Some(delay_tx),
        thresholds: None,
    };
    let printer = spawn_progress_printer(progress_rx, delay_rx);

    println!("Running {} mutation(s)...", mutations.len());
    let op = |_i: usize, m: Mutation| dispatch(&api, &snapshot, default_list, m);
    let outcome = run_batch(mutations, op, &opts, &hooks).await;
    drop(hooks);
    let _ = printer.await;

    println!(
        "Run {}: {} succeeded, {} failed.",
        outcome.disposition(),
        outcome.successful.len(),
        outcome.failed.len()
    );
    if !outcome.failed.is_empty() {
        println!("Failures:");
        for failure in &outcome.failed {
            println!(
                "  {} {}: {}",
                failure.item.kind(),
                summary(&failure.item),
                failure.error
            );
        }
    }
    tracing::info!(
        rate_limit_hits = outcome.stats.rate_limit_hits,
        transient_retries = outcome.stats.transient_retries,
        breaker_pauses = outcome.stats.breaker_pauses,
        "run finished: {}",
        outcome.disposition()
    );

    match outcome.disposition() {
        RunDisposition::Complete => Ok(()),
        disposition => anyhow::bail!(
            "{} ({} of {} item(s) failed)",
            disposition,
            outcome.failed.len(),
            outcome.completed()
        ),
    }
}

/// Route one mutation to its API call. Updates merge their fields over the
/// prefetched snapshot entry; a missing entry is fatal for that item.
async fn dispatch(
    api: &TasksApi,
    snapshot: &SnapshotIndex,
    default_list: Option<&str>,
    mutation: Mutation,
) -> Result<Value, MutationError> {
    match mutation {
        Mutation::Insert { list, task } => {
            api.insert_task(list.as_deref().or(default_list), &task).await
        }
        Mutation::Update { id, fields } => match snapshot.get(&id) {
            Some(snap) => api.update_task(&id, &merge_fields(snap, &fields)).await,
            None => Err(MutationError::MissingSnapshot { id }),
        },
        Mutation::Move { id, to, previous } => {
            api.move_task(&id, &to, previous.as_deref()).await
        }
    }
}

/// Print a progress line per resolved item, carrying the latest pacing
/// telemetry. Ends when the run drops its progress sender.
fn spawn_progress_printer(
    mut progress_rx: mpsc::Receiver<BulkProgress>,
    mut delay_rx: mpsc::Receiver<Duration>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut delay = Duration::ZERO;
        while let Some(tick) = progress_rx.recv().await {
            while let Ok(d) = delay_rx.try_recv() {
                delay = d;
            }
            println!(
                "\r  {} / {} ({:.0}%)  delay {} ms  safe {} ms  ",
                tick.completed,
                tick.total,
                tick.fraction() * 100.0,
                delay.as_millis(),
                tick.thresholds.sustainable_ms
            );
        }
        println!();
    })
}
