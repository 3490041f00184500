//! CLI for the TBM bulk task mutator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tbm_core::config;

use commands::{run_bulk, run_plan, run_simulate, SimulateArgs};

/// Top-level CLI for the TBM bulk task mutator.
#[derive(Debug, Parser)]
#[command(name = "tbm")]
#[command(about = "TBM: adaptive rate-limited bulk task mutations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Execute a batch of task mutations against the configured API.
    Run {
        /// Path to the batch file (one JSON mutation per line).
        batch: PathBuf,

        /// Keep processing after an item fails instead of stopping the run.
        #[arg(long)]
        keep_going: bool,

        /// Default list for inserts that do not name one.
        #[arg(long, value_name = "LIST")]
        list: Option<String>,
    },

    /// Exercise the pacing engine against a built-in flaky operation.
    Simulate {
        /// Number of synthetic items to process.
        #[arg(long, default_value = "25", value_name = "N")]
        items: usize,

        /// Inject a rate-limit error on the first attempt of every Nth item.
        #[arg(long, value_name = "N")]
        rate_limit_every: Option<usize>,

        /// Inject a transient error on the first attempt of every Nth item.
        #[arg(long, value_name = "N")]
        transient_every: Option<usize>,

        /// Zero-based index of an item that fails every attempt.
        #[arg(long, value_name = "INDEX")]
        fail_at: Option<usize>,

        /// Keep processing after an item fails instead of stopping the run.
        #[arg(long)]
        keep_going: bool,

        /// Lowest per-item delay in milliseconds.
        #[arg(long, default_value = "10")]
        floor_ms: u64,

        /// Per-item delay at the start of the run, in milliseconds.
        #[arg(long, default_value = "50")]
        start_ms: u64,

        /// Initial peak delay in milliseconds.
        #[arg(long, default_value = "300")]
        peak_ms: u64,
    },

    /// Parse a batch file and show what would run, without executing.
    Plan {
        /// Path to the batch file (one JSON mutation per line).
        batch: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                batch,
                keep_going,
                list,
            } => run_bulk(&cfg, &batch, keep_going, list.as_deref()).await?,
            CliCommand::Simulate {
                items,
                rate_limit_every,
                transient_every,
                fail_at,
                keep_going,
                floor_ms,
                start_ms,
                peak_ms,
            } => {
                run_simulate(SimulateArgs {
                    items,
                    rate_limit_every,
                    transient_every,
                    fail_at,
                    keep_going,
                    floor_ms,
                    start_ms,
                    peak_ms,
                })
                .await?;
            }
            CliCommand::Plan { batch } => run_plan(&batch)?,
        }

        Ok(())
    }
}
