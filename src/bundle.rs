//! Whole-workspace export and import.
//!
//! The export file is a single JSON object holding every task, note and
//! document. Import appends records under fresh ids so it never clobbers
//! what is already there.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{next_id, Document, Note, Task};
use crate::store::write_json_atomic;
use crate::workspace::Workspace;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportCounts {
    pub tasks: usize,
    pub notes: usize,
    pub documents: usize,
}

impl std::fmt::Display for ImportCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "imported {} tasks, {} notes, {} documents",
            self.tasks, self.notes, self.documents
        )
    }
}

pub fn export(ws: &Workspace, path: &Path) -> Result<()> {
    let bundle = Bundle {
        tasks: ws.tasks.tasks().to_vec(),
        notes: ws.notes.list().to_vec(),
        documents: ws.docs.list().to_vec(),
    };
    write_json_atomic(path, &bundle)?;
    tracing::info!(path = %path.display(), "exported workspace");
    Ok(())
}

/// Parse an export file. A bare JSON array is read as a task list.
pub fn parse(raw: &str) -> Result<Bundle> {
    let value: Value = serde_json::from_str(raw).context("import file is not valid JSON")?;
    match value {
        Value::Array(_) => {
            let tasks: Vec<Task> =
                serde_json::from_value(value).context("invalid task array in import file")?;
            Ok(Bundle {
                tasks,
                ..Bundle::default()
            })
        }
        Value::Object(_) => {
            serde_json::from_value(value).context("invalid bundle in import file")
        }
        _ => bail!("import file must contain a JSON object or array"),
    }
}

/// Renumber `incoming` so its ids continue after `existing`. Returns the
/// merged list and the old-to-new id map.
fn renumber<T: Clone>(
    existing: &[T],
    incoming: Vec<T>,
    next: i64,
    id: impl Fn(&mut T) -> &mut i64,
) -> (Vec<T>, HashMap<i64, i64>) {
    let mut all = existing.to_vec();
    let mut ids = HashMap::new();
    for (offset, mut record) in incoming.into_iter().enumerate() {
        let new_id = next + offset as i64;
        let old_id = std::mem::replace(id(&mut record), new_id);
        ids.entry(old_id).or_insert(new_id);
        all.push(record);
    }
    (all, ids)
}

pub fn import(ws: &mut Workspace, path: &Path) -> Result<ImportCounts> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut bundle = parse(&raw)?;
    let counts = ImportCounts {
        tasks: bundle.tasks.len(),
        notes: bundle.notes.len(),
        documents: bundle.documents.len(),
    };

    if counts.tasks > 0 {
        let existing = ws.tasks.tasks();
        let (all, task_ids) =
            renumber(existing, bundle.tasks, next_id(existing), |t| &mut t.id);
        ws.tasks.replace_all(all)?;
        // Links to tasks outside the file stay as they are.
        for note in &mut bundle.notes {
            if let Some(task_id) = note.task_id.as_mut() {
                if let Some(&new_id) = task_ids.get(&*task_id) {
                    *task_id = new_id;
                }
            }
        }
    }
    if counts.notes > 0 {
        let existing = ws.notes.list();
        let (all, _) = renumber(existing, bundle.notes, next_id(existing), |n| &mut n.id);
        ws.notes.replace_all(all)?;
    }
    if counts.documents > 0 {
        let existing = ws.docs.list();
        let (all, _) = renumber(existing, bundle.documents, next_id(existing), |d| &mut d.id);
        ws.docs.replace_all(all)?;
    }

    tracing::info!(path = %path.display(), ?counts, "imported workspace");
    Ok(counts)
}
