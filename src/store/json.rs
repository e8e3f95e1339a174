use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::RecordStore;
use crate::model::Record;

/// A whole-file JSON array of records.
///
/// A missing file reads as empty. So does a corrupt one, with a warning, so
/// that a half-written file never locks the user out. Writes go through a
/// temp file in the same directory and are renamed into place.
pub struct JsonStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> JsonStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned + Record> JsonStore<T> {
    pub fn read(&self) -> Vec<T> {
        read_json_array(&self.path)
    }

    pub fn write(&self, records: &[T]) -> Result<()> {
        write_json_atomic(&self.path, records)
    }
}

pub(crate) fn read_json_array<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable store, treating as empty");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt store, treating as empty");
            Vec::new()
        }
    }
}

pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

impl<T: Serialize + DeserializeOwned + Record + Clone> RecordStore<T> for JsonStore<T> {
    fn load(&self) -> Result<Vec<T>> {
        Ok(self.read())
    }

    fn save_all(&self, records: &[T]) -> Result<()> {
        self.write(records)
    }

    fn add(&self, record: &T) -> Result<()> {
        let mut all = self.read();
        all.push(record.clone());
        self.write(&all)
    }

    fn update(&self, record: &T) -> Result<()> {
        let mut all = self.read();
        if let Some(slot) = all.iter_mut().find(|r| r.id() == record.id()) {
            *slot = record.clone();
        }
        self.write(&all)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let mut all = self.read();
        let before = all.len();
        all.retain(|r| r.id() != id);
        let removed = all.len() != before;
        if removed {
            self.write(&all)?;
        }
        Ok(removed)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
