//! Import of data left behind by older on-disk layouts.
//!
//! Every step here is best effort: failures are logged and skipped so a stray
//! file never prevents startup.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::json::{read_json_array, write_json_atomic};
use super::{SqliteNoteStore, SqliteTaskStore};
use crate::model::{next_id, Document, Note, Task};

/// Copy the first `name` found in `dirs` to `dest`.
pub(super) fn copy_first_json(dirs: &[PathBuf], name: &str, dest: &Path) {
    for dir in dirs {
        let src = dir.join(name);
        if src == dest || !src.is_file() {
            continue;
        }
        match std::fs::copy(&src, dest) {
            Ok(_) => {
                tracing::info!(from = %src.display(), to = %dest.display(), "imported legacy store");
                return;
            }
            Err(e) => {
                tracing::warn!(from = %src.display(), error = %e, "legacy import failed");
            }
        }
    }
}

pub(super) fn import_tasks(src: &Path, store: &SqliteTaskStore) {
    if !src.is_file() {
        return;
    }
    let tasks: Vec<Task> = read_json_array(src);
    for task in &tasks {
        if let Err(e) = store.insert_or_ignore(task) {
            tracing::warn!(id = task.id, error = %e, "skipping legacy task");
        }
    }
    tracing::info!(from = %src.display(), count = tasks.len(), "imported legacy tasks");
}

pub(super) fn import_notes(src: &Path, store: &SqliteNoteStore) {
    if !src.is_file() {
        return;
    }
    let notes: Vec<Note> = read_json_array(src);
    for note in &notes {
        if let Err(e) = store.insert_or_ignore(note) {
            tracing::warn!(id = note.id, error = %e, "skipping legacy note");
        }
    }
    tracing::info!(from = %src.display(), count = notes.len(), "imported legacy notes");
}

/// Pull documents out of a legacy file.
///
/// Accepts a bare array of document-like objects, or an object holding the
/// array under `documents`, `docs` or `task_neko_data.documents`. Fields fall
/// back through `name`, `body`/`content` and `labels`; missing ids are
/// assigned after the largest one seen.
fn extract_documents(value: Value) -> Vec<Document> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let nested = map
                .get_mut("task_neko_data")
                .and_then(|v| v.get_mut("documents"))
                .map(Value::take);
            match map
                .remove("documents")
                .or_else(|| map.remove("docs"))
                .or(nested)
            {
                Some(Value::Array(items)) => items,
                _ => return Vec::new(),
            }
        }
        _ => return Vec::new(),
    };

    let mut docs: Vec<Document> = Vec::new();
    let mut pending: Vec<Document> = Vec::new();
    for item in &items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let text_of = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| obj.get(*k).and_then(Value::as_str))
                .find(|s| !s.is_empty())
                .map(str::to_string)
        };
        let id = obj.get("id").and_then(Value::as_i64);
        let Some(text) = text_of(&["text", "body", "content"]) else {
            continue;
        };
        let title = text_of(&["title", "name"])
            .unwrap_or_else(|| format!("Doc {}", id.map(|i| i.to_string()).unwrap_or_default()));
        let tags = ["tags", "labels"]
            .iter()
            .filter_map(|k| obj.get(*k).and_then(Value::as_array))
            .find(|a| !a.is_empty())
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let doc = Document {
            id: id.unwrap_or(0),
            title,
            text,
            tags,
            links: Vec::new(),
            created: text_of(&["created"]).unwrap_or_default(),
            updated: text_of(&["updated"]).unwrap_or_default(),
        };
        if id.is_some() {
            docs.push(doc);
        } else {
            pending.push(doc);
        }
    }
    for mut doc in pending {
        doc.id = next_id(&docs);
        docs.push(doc);
    }
    docs
}

pub(super) fn import_documents(dirs: &[PathBuf], dest: &Path) {
    for dir in dirs {
        for name in ["docs.json", "documents.json", "task_neko_data.json"] {
            let src = dir.join(name);
            if src == dest || !src.is_file() {
                continue;
            }
            let value = match std::fs::read_to_string(&src)
                .ok()
                .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            {
                Some(v) => v,
                None => {
                    tracing::warn!(from = %src.display(), "unreadable legacy documents");
                    continue;
                }
            };
            let docs = extract_documents(value);
            if docs.is_empty() {
                continue;
            }
            match write_json_atomic(dest, &docs) {
                Ok(()) => {
                    tracing::info!(from = %src.display(), count = docs.len(), "imported legacy documents");
                    return;
                }
                Err(e) => tracing::warn!(error = %e, "legacy document import failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn documents_from_wrapped_shapes() {
        let doc = json!({"id": 1, "title": "T", "text": "body"});
        for key in ["docs", "documents"] {
            let docs = extract_documents(json!({ key: [doc.clone()] }));
            assert_eq!(docs.len(), 1, "key {key}");
        }
        let nested = extract_documents(json!({"task_neko_data": {"documents": [doc.clone()]}}));
        assert_eq!(nested.len(), 1);
        assert_eq!(extract_documents(json!([doc])).len(), 1);
        assert!(extract_documents(json!({"other": []})).is_empty());
        assert!(extract_documents(json!("nope")).is_empty());
    }

    #[test]
    fn documents_fields_fall_back() {
        let docs = extract_documents(json!([
            {"id": 5, "name": "Named", "content": "c", "labels": ["x"]},
            {"body": "no id"},
            {"title": "no text"}
        ]));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "Named");
        assert_eq!(docs[0].text, "c");
        assert_eq!(docs[0].tags, vec!["x"]);
        assert_eq!(docs[1].id, 6);
        assert_eq!(docs[1].title, "Doc ");
    }

    #[test]
    fn import_documents_skips_empty_sources() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("docs.json"), "[]").unwrap();
        std::fs::write(
            b.join("documents.json"),
            r#"{"documents": [{"id": 4, "title": "Plan", "text": "write it"}]}"#,
        )
        .unwrap();
        let dest = dir.path().join("out/docs.json");
        import_documents(&[a, b], &dest);
        let docs: Vec<Document> = read_json_array(&dest);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, 4);
    }
}
