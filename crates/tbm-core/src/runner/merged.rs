//! Update-with-merge mode.
//!
//! Some task APIs require a full resource representation on update, so field
//! patches are merged over a snapshot of the current tasks fetched once
//! before the run. The merge is a shallow spread: patch fields win, all
//! other snapshot fields pass through.

use std::collections::HashMap;
use std::future::Future;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::retry::MutationError;

use super::outcome::BulkOutcome;
use super::run::{run_batch, RunOptions};
use super::telemetry::RunHooks;

/// Field changes for one task, keyed by the task id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// Prefetched task snapshots indexed by id.
///
/// Entries without a string or numeric `id` are skipped; numeric ids are
/// indexed by their decimal rendering. On duplicate ids the last entry wins.
#[derive(Debug, Default)]
pub struct SnapshotIndex {
    by_id: HashMap<String, Value>,
}

impl SnapshotIndex {
    pub fn build(items: Vec<Value>) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        for item in items {
            match snapshot_id(&item) {
                Some(id) => {
                    by_id.insert(id, item);
                }
                None => tracing::warn!("skipping snapshot entry without usable id"),
            }
        }
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn snapshot_id(item: &Value) -> Option<String> {
    match item.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Shallow merge of patch fields over a snapshot object. Patch fields
/// overwrite snapshot fields key by key; nested objects are replaced whole,
/// not merged. A non-object snapshot contributes nothing.
pub fn merge_fields(snapshot: &Value, fields: &Map<String, Value>) -> Value {
    let mut merged = match snapshot {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    for (key, value) in fields {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}

/// Run a batch of field patches against a prefetched snapshot.
///
/// `prefetch` is awaited once before any per-item work; its failure is the
/// only error this function propagates. Each patch is merged over its
/// snapshot entry and handed to `op` as `(index, id, merged_body)`. A patch
/// whose id is absent from the snapshot fails fatally without invoking `op`
/// and without consuming a retry.
pub async fn run_merged_updates<R, F, Fut, P, PFut>(
    patches: Vec<FieldPatch>,
    prefetch: P,
    mut op: F,
    opts: &RunOptions,
    hooks: &RunHooks,
) -> Result<BulkOutcome<FieldPatch, R>>
where
    P: FnOnce() -> PFut,
    PFut: Future<Output = Result<Vec<Value>>>,
    F: FnMut(usize, String, Value) -> Fut,
    Fut: Future<Output = Result<R, MutationError>>,
{
    let snapshot = prefetch()
        .await
        .context("prefetch task snapshot for merge updates")?;
    let index = SnapshotIndex::build(snapshot);
    tracing::debug!(
        entries = index.len(),
        patches = patches.len(),
        "snapshot indexed for merge updates"
    );

    let merged_op = move |i: usize, patch: FieldPatch| {
        let prepared = index
            .get(&patch.id)
            .map(|snap| op(i, patch.id.clone(), merge_fields(snap, &patch.fields)));
        let id = patch.id;
        async move {
            match prepared {
                Some(fut) => fut.await,
                None => Err(MutationError::MissingSnapshot { id }),
            }
        }
    };
    Ok(run_batch(patches, merged_op, opts, hooks).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn merge_overwrites_and_passes_through() {
        let snap = json!({"id": "a", "title": "old", "done": false});
        let merged = merge_fields(&snap, &fields(&[("title", json!("new"))]));
        assert_eq!(merged, json!({"id": "a", "title": "new", "done": false}));
    }

    #[test]
    fn merge_is_shallow() {
        let snap = json!({"id": "a", "meta": {"x": 1, "y": 2}});
        let merged = merge_fields(&snap, &fields(&[("meta", json!({"z": 3}))]));
        assert_eq!(merged, json!({"id": "a", "meta": {"z": 3}}));
    }

    #[test]
    fn merge_with_non_object_snapshot_keeps_fields_only() {
        let merged = merge_fields(&json!(42), &fields(&[("title", json!("t"))]));
        assert_eq!(merged, json!({"title": "t"}));
    }

    #[test]
    fn index_skips_unusable_entries() {
        let index = SnapshotIndex::build(vec![
            json!({"id": "a", "title": "x"}),
            json!({"title": "no id"}),
            json!("not an object"),
            json!({"id": 7, "title": "numeric"}),
        ]);
        assert_eq!(index.len(), 2);
        assert!(index.get("a").is_some());
        assert!(index.get("7").is_some());
        assert!(index.get("no id").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn merged_updates_call_op_with_merged_body() {
        let patches = vec![FieldPatch {
            id: "a".into(),
            fields: fields(&[("title", json!("new"))]),
        }];
        let prefetch = || async { Ok(vec![json!({"id": "a", "title": "old", "done": true})]) };
        let op = |_i: usize, id: String, body: Value| async move {
            assert_eq!(id, "a");
            Ok::<_, MutationError>(body)
        };
        let opts = RunOptions::default();
        let out = run_merged_updates(patches, prefetch, op, &opts, &RunHooks::none())
            .await
            .unwrap();
        assert_eq!(out.successful.len(), 1);
        assert_eq!(
            out.successful[0].response,
            json!({"id": "a", "title": "new", "done": true})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_snapshot_entry_fails_without_calling_op() {
        let patches = vec![
            FieldPatch {
                id: "known".into(),
                fields: fields(&[("done", json!(true))]),
            },
            FieldPatch {
                id: "ghost".into(),
                fields: fields(&[("done", json!(true))]),
            },
            FieldPatch {
                id: "known".into(),
                fields: fields(&[("done", json!(false))]),
            },
        ];
        let prefetch = || async { Ok(vec![json!({"id": "known", "done": false})]) };
        let calls = AtomicU32::new(0);
        let op = |_i: usize, _id: String, _body: Value| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, MutationError>(()) }
        };
        let opts = RunOptions::default();
        let out = run_merged_updates(patches, prefetch, op, &opts, &RunHooks::none())
            .await
            .unwrap();

        assert_eq!(out.successful.len(), 1);
        assert_eq!(out.failed.len(), 1);
        assert!(out.stopped);
        assert!(matches!(
            out.failed[0].error,
            MutationError::MissingSnapshot { .. }
        ));
        // Only the first patch reached the operation; the third never ran.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn prefetch_failure_propagates() {
        let prefetch = || async { anyhow::bail!("tasks endpoint unreachable") };
        let op = |_i: usize, _id: String, _body: Value| async { Ok::<_, MutationError>(()) };
        let opts = RunOptions::default();
        let err = run_merged_updates(Vec::new(), prefetch, op, &opts, &RunHooks::none())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("prefetch task snapshot"));
    }
}
