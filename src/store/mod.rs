//! Record stores for tasks and notes.
//!
//! Two interchangeable backends implement [`RecordStore`]: a whole-file JSON
//! array and a SQLite table. Managers load everything into memory and call
//! back into the store on each mutation.

mod json;
mod legacy;
mod sqlite;

use std::fmt;
use std::path::Path;

use anyhow::{bail, Result};

use crate::config::DataPaths;
use crate::model::{Note, Task};

pub use json::JsonStore;
pub(crate) use json::{read_json_array, write_json_atomic};
pub use sqlite::{SqliteNoteStore, SqliteTaskStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    #[default]
    Json,
    Sqlite,
}

impl Backend {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            _ => bail!("invalid backend '{s}': must be json or sqlite"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait RecordStore<T> {
    fn load(&self) -> Result<Vec<T>>;
    fn save_all(&self, records: &[T]) -> Result<()>;
    fn add(&self, record: &T) -> Result<()>;
    fn update(&self, record: &T) -> Result<()>;
    /// Returns false when no record had that id.
    fn delete(&self, id: i64) -> Result<bool>;
    fn path(&self) -> &Path;
}

pub type TaskStore = dyn RecordStore<Task>;
pub type NoteStore = dyn RecordStore<Note>;

pub fn make_task_store(backend: Backend, paths: &DataPaths) -> Result<Box<TaskStore>> {
    paths.ensure_app_data()?;
    match backend {
        Backend::Json => {
            let path = paths.tasks_json();
            if !path.exists() {
                legacy::copy_first_json(&paths.legacy_dirs(), "tasks.json", &path);
            }
            Ok(Box::new(JsonStore::<Task>::new(path)))
        }
        Backend::Sqlite => {
            let path = paths.tasks_db();
            let fresh = !path.exists();
            let store = SqliteTaskStore::open(path)?;
            if fresh {
                for dir in paths.legacy_dirs() {
                    legacy::import_tasks(&dir.join("tasks.json"), &store);
                }
            }
            Ok(Box::new(store))
        }
    }
}

pub fn make_note_store(backend: Backend, paths: &DataPaths) -> Result<Box<NoteStore>> {
    paths.ensure_app_data()?;
    match backend {
        Backend::Json => {
            let path = paths.notes_json();
            if !path.exists() {
                legacy::copy_first_json(&paths.legacy_dirs(), "notes.json", &path);
            }
            Ok(Box::new(JsonStore::<Note>::new(path)))
        }
        Backend::Sqlite => {
            let path = paths.notes_db();
            let fresh = !path.exists();
            let store = SqliteNoteStore::open(path)?;
            if fresh {
                for dir in paths.legacy_dirs() {
                    legacy::import_notes(&dir.join("notes.json"), &store);
                }
            }
            Ok(Box::new(store))
        }
    }
}

pub fn make_document_store(paths: &DataPaths) -> Result<JsonStore<crate::model::Document>> {
    paths.ensure_app_data()?;
    let path = paths.docs_json();
    if !path.exists() {
        let mut dirs = paths.legacy_dirs();
        dirs.insert(dirs.len() - 1, paths.root.join("task_neko"));
        legacy::import_documents(&dirs, &path);
    }
    Ok(JsonStore::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn task(id: i64, text: &str, completed: bool) -> Task {
        Task {
            id,
            text: text.into(),
            created: format!("t{id}"),
            completed,
            details: vec![],
            priority: 3,
            tags: vec![],
        }
    }

    fn run_sequence(store: &TaskStore) {
        let tasks = vec![task(1, "First task", false), task(2, "Second task", true)];
        for t in &tasks {
            store.add(t).unwrap();
        }
        let loaded = store.load().unwrap();
        assert_eq!(loaded, tasks);

        let mut first = tasks[0].clone();
        first.text = "First task - updated".into();
        store.update(&first).unwrap();
        assert!(store
            .load()
            .unwrap()
            .iter()
            .any(|t| t.text == "First task - updated"));

        assert!(store.delete(2).unwrap());
        assert!(!store.delete(2).unwrap());
        assert!(store.load().unwrap().iter().all(|t| t.id != 2));
    }

    #[test]
    fn json_and_sqlite_parity() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        run_sequence(make_task_store(Backend::Json, &paths).unwrap().as_ref());
        run_sequence(make_task_store(Backend::Sqlite, &paths).unwrap().as_ref());
    }

    #[test]
    fn backend_parse() {
        assert_eq!(Backend::parse("sqlite").unwrap(), Backend::Sqlite);
        assert!(Backend::parse("redis").is_err());
    }

    #[test]
    fn json_backend_copies_legacy_tasks() {
        let dir = TempDir::new().unwrap();
        let legacy = dir.path().join("data_pkms");
        std::fs::create_dir_all(&legacy).unwrap();
        std::fs::write(
            legacy.join("tasks.json"),
            r#"[{"id": 3, "text": "from legacy", "created": "t", "completed": false}]"#,
        )
        .unwrap();
        let paths = DataPaths::new(dir.path());
        let store = make_task_store(Backend::Json, &paths).unwrap();
        let tasks = store.load().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 3);
        assert!(paths.tasks_json().exists());
    }

    #[test]
    fn sqlite_backend_imports_legacy_tasks_once() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("tasks.json"),
            r#"[{"id": 1, "text": "top level", "created": "t", "completed": true, "details": ["d"]}]"#,
        )
        .unwrap();
        let paths = DataPaths::new(dir.path());
        let store = make_task_store(Backend::Sqlite, &paths).unwrap();
        let tasks = store.load().unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].completed);
        assert_eq!(tasks[0].details, vec!["d"]);

        store.delete(1).unwrap();
        let again = make_task_store(Backend::Sqlite, &paths).unwrap();
        assert!(again.load().unwrap().is_empty());
    }
}
