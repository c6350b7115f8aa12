//! Database schema migrations for focusboard.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = schema_version(conn)?;
    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0)) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, tasks, sessions and the kv table.
///
/// Tags and subtasks are stored as JSON arrays.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id    TEXT PRIMARY KEY,
            info  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL,
            title               TEXT NOT NULL,
            description         TEXT,
            status              TEXT NOT NULL DEFAULT 'todo',
            estimated_pomodoros INTEGER NOT NULL DEFAULT 2,
            completed_pomodoros INTEGER NOT NULL DEFAULT 0,
            tags                TEXT NOT NULL DEFAULT '[]',
            cognitive_load      TEXT NOT NULL DEFAULT 'medium',
            subtasks            TEXT NOT NULL DEFAULT '[]',
            sort_order          INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            due_date            TEXT
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL,
            task_id      TEXT NOT NULL,
            phase        TEXT NOT NULL,
            started_at   TEXT NOT NULL,
            ended_at     TEXT,
            duration_min INTEGER NOT NULL DEFAULT 0,
            completed    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: local accounts for email/password sign-in.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS accounts (
            email           TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL UNIQUE,
            salt            TEXT NOT NULL,
            password_digest TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
