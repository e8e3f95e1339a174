use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::RecordStore;
use crate::db;
use crate::model::{Note, Task, DEFAULT_PRIORITY};

const TASK_COLUMNS: &str = "id, text, created, completed, details, priority, tags";
const NOTE_COLUMNS: &str = "id, text, created, details, task_id";

fn decode_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn encode_list(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let priority: Option<i64> = row.get(5)?;
    Ok(Task {
        id: row.get(0)?,
        text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        created: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        completed: row.get::<_, Option<i64>>(3)?.unwrap_or(0) != 0,
        details: decode_list(row.get(4)?),
        priority: priority
            .and_then(|p| u8::try_from(p).ok())
            .unwrap_or(DEFAULT_PRIORITY),
        tags: decode_list(row.get(6)?),
    })
}

fn read_note_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        created: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        details: decode_list(row.get(3)?),
        task_id: row.get(4)?,
    })
}

/// Tasks in a SQLite table. A connection is opened per operation.
pub struct SqliteTaskStore {
    path: PathBuf,
}

impl SqliteTaskStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        store.connect()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = db::open(&self.path)?;
        db::init_tasks(&conn)?;
        Ok(conn)
    }

    /// Insert keeping an existing row with the same id.
    pub fn insert_or_ignore(&self, task: &Task) -> Result<()> {
        let conn = self.connect()?;
        insert_task(&conn, "INSERT OR IGNORE", task)
    }

    pub fn get(&self, id: i64) -> Result<Option<Task>> {
        let conn = self.connect()?;
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                read_task_row,
            )
            .optional()?;
        Ok(task)
    }
}

fn insert_task(conn: &Connection, verb: &str, task: &Task) -> Result<()> {
    conn.execute(
        &format!("{verb} INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            task.id,
            task.text,
            task.created,
            task.completed as i64,
            encode_list(&task.details),
            task.priority as i64,
            encode_list(&task.tags),
        ],
    )?;
    Ok(())
}

impl RecordStore<Task> for SqliteTaskStore {
    fn load(&self) -> Result<Vec<Task>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))?;
        let rows = stmt.query_map([], read_task_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_all(&self, tasks: &[Task]) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM tasks", [])?;
        for task in tasks {
            insert_task(&tx, "INSERT", task)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn add(&self, task: &Task) -> Result<()> {
        let conn = self.connect()?;
        insert_task(&conn, "INSERT OR REPLACE", task)
    }

    fn update(&self, task: &Task) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE tasks SET text = ?1, completed = ?2, details = ?3, priority = ?4, tags = ?5
             WHERE id = ?6",
            params![
                task.text,
                task.completed as i64,
                encode_list(&task.details),
                task.priority as i64,
                encode_list(&task.tags),
                task.id,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Notes in a SQLite table. A connection is opened per operation.
pub struct SqliteNoteStore {
    path: PathBuf,
}

impl SqliteNoteStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        store.connect()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = db::open(&self.path)?;
        db::init_notes(&conn)?;
        Ok(conn)
    }

    pub fn insert_or_ignore(&self, note: &Note) -> Result<()> {
        let conn = self.connect()?;
        insert_note(&conn, "INSERT OR IGNORE", note)
    }
}

fn insert_note(conn: &Connection, verb: &str, note: &Note) -> Result<()> {
    conn.execute(
        &format!("{verb} INTO notes ({NOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        params![
            note.id,
            note.text,
            note.created,
            encode_list(&note.details),
            note.task_id,
        ],
    )?;
    Ok(())
}

impl RecordStore<Note> for SqliteNoteStore {
    fn load(&self) -> Result<Vec<Note>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY id"))?;
        let rows = stmt.query_map([], read_note_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn save_all(&self, notes: &[Note]) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM notes", [])?;
        for note in notes {
            insert_note(&tx, "INSERT", note)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn add(&self, note: &Note) -> Result<()> {
        let conn = self.connect()?;
        insert_note(&conn, "INSERT OR REPLACE", note)
    }

    fn update(&self, note: &Note) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE notes SET text = ?1, details = ?2, task_id = ?3 WHERE id = ?4",
            params![note.text, encode_list(&note.details), note.task_id, note.id],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
