//! CLI command handlers. Each command is in its own file for clarity.

mod plan;
mod run;
mod simulate;

pub use plan::run_plan;
pub use run::run_bulk;
pub use simulate::{run_simulate, SimulateArgs};

use tbm_core::batch::Mutation;

/// One-line rendering of a mutation for previews and failure tables.
pub(crate) fn summary(mutation: &Mutation) -> String {
    match mutation {
        Mutation::Insert { list, task } => {
            let title = task
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or("(untitled)");
            match list {
                Some(list) => format!("\"{}\" into {}", title, list),
                None => format!("\"{}\"", title),
            }
        }
        Mutation::Update { id, fields } => format!("{} ({} field(s))", id, fields.len()),
        Mutation::Move { id, to, previous } => match previous {
            Some(previous) => format!("{} to {} after {}", id, to, previous),
            None => format!("{} to {}", id, to),
        },
    }
}
