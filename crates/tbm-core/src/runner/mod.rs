//! Sequential bulk runner.
//!
//! Drives a list of work items through the retry loop one at a time, feeds
//! outcomes to the pacing controller, sleeps the adaptive delay between
//! items, and aggregates results. Also hosts the update-with-merge mode for
//! APIs that require full resource representations.

mod merged;
mod outcome;
mod run;
mod telemetry;

pub use merged::{merge_fields, run_merged_updates, FieldPatch, SnapshotIndex};
pub use outcome::{BulkOutcome, ItemFailure, ItemSuccess, RunDisposition, RunStats};
pub use run::{run_batch, RunOptions};
pub use telemetry::{BulkProgress, RunHooks};
