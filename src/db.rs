use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

const TASKS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id        INTEGER PRIMARY KEY,
    text      TEXT,
    created   TEXT,
    completed INTEGER,
    details   TEXT,
    priority  INTEGER DEFAULT 3,
    tags      TEXT DEFAULT '[]'
);
";

const NOTES_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id      INTEGER PRIMARY KEY,
    text    TEXT,
    created TEXT,
    details TEXT,
    task_id INTEGER
);
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    set_pragmas(&conn)?;
    Ok(conn)
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

/// Add a column when an older database predates it.
fn ensure_column(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<()> {
    if !column_names(conn, table)?.iter().any(|c| c == column) {
        tracing::info!(table, column, "adding missing column");
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
    }
    Ok(())
}

pub fn init_tasks(conn: &Connection) -> Result<()> {
    conn.execute_batch(TASKS_SCHEMA)?;
    ensure_column(conn, "tasks", "priority", "INTEGER DEFAULT 3")?;
    ensure_column(conn, "tasks", "tags", "TEXT DEFAULT '[]'")?;
    Ok(())
}

pub fn init_notes(conn: &Connection) -> Result<()> {
    conn.execute_batch(NOTES_SCHEMA)?;
    ensure_column(conn, "notes", "task_id", "INTEGER")?;
    Ok(())
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init_tasks(&conn)?;
    init_notes(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = open_memory().unwrap();
        init_tasks(&conn).unwrap();
        init_notes(&conn).unwrap();
        let cols = column_names(&conn, "tasks").unwrap();
        assert_eq!(
            cols,
            vec!["id", "text", "created", "completed", "details", "priority", "tags"]
        );
    }

    #[test]
    fn old_tables_gain_new_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tasks (id INTEGER PRIMARY KEY, text TEXT, created TEXT, completed INTEGER, details TEXT);
             CREATE TABLE notes (id INTEGER PRIMARY KEY, text TEXT, created TEXT, details TEXT);
             INSERT INTO tasks (id, text, created, completed, details) VALUES (1, 'legacy', 't', 0, '[]');",
        )
        .unwrap();
        init_tasks(&conn).unwrap();
        init_notes(&conn).unwrap();
        let priority: i64 = conn
            .query_row("SELECT priority FROM tasks WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(priority, 3);
        assert!(column_names(&conn, "notes")
            .unwrap()
            .contains(&"task_id".to_string()));
    }
}
