//! `tbm plan` – parse and preview a batch without executing it.

use anyhow::Result;
use std::path::Path;

use tbm_core::batch::{read_batch, Mutation};

use crate::cli::commands::summary;

const PREVIEW_LIMIT: usize = 10;

pub fn run_plan(batch_path: &Path) -> Result<()> {
    let mutations = read_batch(batch_path)?;
    if mutations.is_empty() {
        println!("Batch is empty.");
        return Ok(());
    }

    let (mut inserts, mut updates, mut moves) = (0usize, 0usize, 0usize);
    for mutation in &mutations {
        match mutation {
            Mutation::Insert { .. } => inserts += 1,
            Mutation::Update { .. } => updates += 1,
            Mutation::Move { .. } => moves += 1,
        }
    }
    println!(
        "{} mutation(s): {} insert, {} update, {} move",
        mutations.len(),
        inserts,
        updates,
        moves
    );
    if updates > 0 {
        println!("A task snapshot will be fetched before the run (updates present).");
    }

    for (i, mutation) in mutations.iter().take(PREVIEW_LIMIT).enumerate() {
        println!("  {:>3}. {} {}", i + 1, mutation.kind(), summary(mutation));
    }
    if mutations.len() > PREVIEW_LIMIT {
        println!("  ... and {} more", mutations.len() - PREVIEW_LIMIT);
    }
    Ok(())
}
