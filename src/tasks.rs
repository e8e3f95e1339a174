use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::model::{created_date, next_id, now_timestamp, Task};
use crate::store::TaskStore;
use crate::validate::{validate_priority, validate_text};

/// Called with the task after it transitions from open to completed.
pub type CompletionHook = Box<dyn FnMut(&Task)>;

/// In-memory task list backed by a [`TaskStore`].
///
/// Lookups that miss return `None`/`false`; only store failures are errors.
pub struct TaskManager {
    store: Box<TaskStore>,
    tasks: Vec<Task>,
    on_complete: Option<CompletionHook>,
}

impl TaskManager {
    pub fn load(store: Box<TaskStore>) -> Result<Self> {
        let tasks = store.load()?;
        tracing::debug!(count = tasks.len(), path = %store.path().display(), "loaded tasks");
        Ok(Self {
            store,
            tasks,
            on_complete: None,
        })
    }

    pub fn set_completion_hook(&mut self, hook: CompletionHook) {
        self.on_complete = Some(hook);
    }

    pub fn reload(&mut self) -> Result<()> {
        self.tasks = self.store.load()?;
        Ok(())
    }

    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn add(&mut self, text: &str, priority: u8, tags: Vec<String>) -> Result<Task> {
        validate_text("task text", text)?;
        validate_priority(priority)?;
        let task = Task {
            id: next_id(&self.tasks),
            text: text.trim().to_string(),
            created: now_timestamp(),
            completed: false,
            details: Vec::new(),
            priority,
            tags,
        };
        self.store.add(&task)?;
        self.tasks.push(task.clone());
        tracing::debug!(id = task.id, "added task");
        Ok(task)
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn list(&self, include_completed: bool) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| include_completed || !t.completed)
            .collect()
    }

    /// Case-insensitive substring match over text, details and tags.
    pub fn search(&self, query: &str) -> Vec<&Task> {
        let q = query.to_lowercase();
        self.tasks
            .iter()
            .filter(|t| {
                t.text.to_lowercase().contains(&q)
                    || t.details.iter().any(|d| d.to_lowercase().contains(&q))
                    || t.tags.iter().any(|tag| tag.to_lowercase().contains(&q))
            })
            .collect()
    }

    /// Apply `f` to the task with `id` and persist it.
    fn modify(&mut self, id: i64, f: impl FnOnce(&mut Task)) -> Result<Option<Task>> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        f(task);
        let updated = task.clone();
        self.store.update(&updated)?;
        Ok(Some(updated))
    }

    pub fn edit(&mut self, id: i64, text: &str) -> Result<Option<Task>> {
        validate_text("task text", text)?;
        let text = text.trim().to_string();
        self.modify(id, |t| t.text = text)
    }

    pub fn set_priority(&mut self, id: i64, priority: u8) -> Result<Option<Task>> {
        validate_priority(priority)?;
        self.modify(id, |t| t.priority = priority)
    }

    pub fn set_tags(&mut self, id: i64, tags: Vec<String>) -> Result<Option<Task>> {
        self.modify(id, |t| t.tags = tags)
    }

    pub fn add_detail(&mut self, id: i64, detail: &str) -> Result<Option<Task>> {
        validate_text("detail", detail)?;
        let detail = detail.trim().to_string();
        self.modify(id, |t| t.details.push(detail))
    }

    /// Remove the detail at a 0-based `index`. A bad index is a miss.
    pub fn remove_detail(&mut self, id: i64, index: usize) -> Result<Option<Task>> {
        match self.get(id) {
            Some(t) if index < t.details.len() => {}
            _ => return Ok(None),
        }
        self.modify(id, |t| {
            t.details.remove(index);
        })
    }

    pub fn toggle(&mut self, id: i64) -> Result<Option<Task>> {
        let Some(current) = self.get(id).map(|t| t.completed) else {
            return Ok(None);
        };
        self.set_completed(id, !current)
    }

    pub fn set_completed(&mut self, id: i64, completed: bool) -> Result<Option<Task>> {
        let Some(was) = self.get(id).map(|t| t.completed) else {
            return Ok(None);
        };
        let updated = self.modify(id, |t| t.completed = completed)?;
        if let Some(task) = &updated {
            if completed && !was {
                tracing::debug!(id, "task completed");
                if let Some(hook) = self.on_complete.as_mut() {
                    hook(task);
                }
            }
        }
        Ok(updated)
    }

    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let removed = self.store.delete(id)?;
        self.tasks.retain(|t| t.id != id);
        Ok(removed)
    }

    /// Write every task as a JSON array to `path`.
    pub fn export(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.tasks)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn added_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| created_date(&t.created) == Some(date))
            .collect()
    }

    /// Replace the whole store with `tasks`.
    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Result<()> {
        self.store.save_all(&tasks)?;
        self.tasks = tasks;
        Ok(())
    }
}
