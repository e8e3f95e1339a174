use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::model::{created_date, next_id, now_timestamp, Note};
use crate::store::NoteStore;
use crate::validate::{resolve_display_index, validate_text};

/// Notes addressed by 1-based position in listing order.
pub struct NoteManager {
    store: Box<NoteStore>,
    notes: Vec<Note>,
}

impl NoteManager {
    pub fn load(store: Box<NoteStore>) -> Result<Self> {
        let notes = store.load()?;
        tracing::debug!(count = notes.len(), path = %store.path().display(), "loaded notes");
        Ok(Self { store, notes })
    }

    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    pub fn add(&mut self, text: &str, task_id: Option<i64>) -> Result<Note> {
        validate_text("note text", text)?;
        let note = Note {
            id: next_id(&self.notes),
            text: text.trim().to_string(),
            created: now_timestamp(),
            details: Vec::new(),
            task_id,
        };
        self.store.add(&note)?;
        self.notes.push(note.clone());
        Ok(note)
    }

    pub fn list(&self) -> &[Note] {
        &self.notes
    }

    pub fn search(&self, query: &str) -> Vec<(usize, &Note)> {
        let q = query.to_lowercase();
        self.notes
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                n.text.to_lowercase().contains(&q)
                    || n.details.iter().any(|d| d.to_lowercase().contains(&q))
            })
            .map(|(i, n)| (i + 1, n))
            .collect()
    }

    fn position(&self, display_index: usize) -> Result<usize> {
        let id = resolve_display_index(&self.notes, display_index).context("note not found")?;
        self.notes
            .iter()
            .position(|n| n.id == id)
            .context("note not found")
    }

    pub fn get(&self, display_index: usize) -> Result<&Note> {
        let pos = self.position(display_index)?;
        Ok(&self.notes[pos])
    }

    /// Append a detail line to the note at `display_index`.
    pub fn describe(&mut self, display_index: usize, detail: &str) -> Result<Note> {
        validate_text("detail", detail)?;
        let pos = self.position(display_index)?;
        self.notes[pos].details.push(detail.trim().to_string());
        let note = self.notes[pos].clone();
        self.store.update(&note)?;
        Ok(note)
    }

    pub fn delete(&mut self, display_index: usize) -> Result<bool> {
        let pos = self.position(display_index)?;
        let id = self.notes[pos].id;
        let removed = self.store.delete(id)?;
        self.notes.remove(pos);
        Ok(removed)
    }

    pub fn added_on(&self, date: NaiveDate) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| created_date(&n.created) == Some(date))
            .collect()
    }

    pub fn replace_all(&mut self, notes: Vec<Note>) -> Result<()> {
        self.store.save_all(&notes)?;
        self.notes = notes;
        Ok(())
    }
}
