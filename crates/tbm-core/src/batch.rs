//! Batch file parsing: one JSON mutation per line.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One task mutation from a batch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Create a task, optionally in a named list.
    Insert {
        #[serde(default)]
        list: Option<String>,
        task: Value,
    },
    /// Patch fields of an existing task.
    Update {
        id: String,
        fields: Map<String, Value>,
    },
    /// Move a task to another list, optionally after a sibling task.
    Move {
        id: String,
        to: String,
        #[serde(default)]
        previous: Option<String>,
    },
}

impl Mutation {
    /// Short operation name for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Insert { .. } => "insert",
            Mutation::Update { .. } => "update",
            Mutation::Move { .. } => "move",
        }
    }
}

/// Read a batch file: one JSON mutation per line, blank lines skipped.
pub fn read_batch(path: &Path) -> Result<Vec<Mutation>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read batch file {}", path.display()))?;
    parse_batch(&data)
}

/// Parse batch file contents. Parse errors name the offending line.
pub fn parse_batch(data: &str) -> Result<Vec<Mutation>> {
    let mut mutations = Vec::new();
    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mutation: Mutation = serde_json::from_str(line)
            .with_context(|| format!("batch line {}: invalid mutation", lineno + 1))?;
        mutations.push(mutation);
    }
    Ok(mutations)
}
