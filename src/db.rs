use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "planboard.sqlite3";

pub fn open_db(workspace: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.busy_timeout(busy_timeout)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            key TEXT PRIMARY KEY,
            body TEXT NOT NULL
        )",
        [],
    )?;

    // Early workspaces stored bodies without a write timestamp column.
    ensure_documents_updated_at(conn)?;
    Ok(())
}

fn ensure_documents_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "documents", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE documents ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

pub fn document_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let body = conn
        .query_row("SELECT body FROM documents WHERE key = ?", [key], |r| {
            r.get::<_, String>(0)
        })
        .optional()?;
    Ok(body)
}

/// Whole-document overwrite; there is no version check.
pub fn document_set(
    conn: &Connection,
    key: &str,
    body: &str,
    updated_at: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO documents(key, body, updated_at)
         VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET
           body = excluded.body,
           updated_at = excluded.updated_at",
        (key, body, updated_at),
    )?;
    Ok(())
}

pub fn document_keys_with_prefix(conn: &Connection, prefix: &str) -> anyhow::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT key FROM documents WHERE substr(key, 1, ?) = ? ORDER BY key")?;
    let keys = stmt
        .query_map((prefix.chars().count() as i64, prefix), |row| {
            row.get::<_, String>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
