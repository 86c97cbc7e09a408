/*!
 * Database schema definitions and migrations.
 *
 * Two tables back the SQLite artifact store: `sessions` (one row per
 * document run, carrying the serialized manifest) and `artifacts` (one
 * serialized `DocumentModel` per session and stage).
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create the schema on a fresh database, or verify an existing one
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    match get_schema_version(conn)? {
        0 => {
            info!("Initializing session database schema v{}", SCHEMA_VERSION);
            create_all_tables(conn)?;
            set_schema_version(conn, SCHEMA_VERSION)?;
        }
        SCHEMA_VERSION => debug!("Session database schema is up to date (v{})", SCHEMA_VERSION),
        other => {
            return Err(anyhow::anyhow!(
                "Session database has schema v{}, this build reads v{}",
                other,
                SCHEMA_VERSION
            ));
        }
    }

    // Per-connection setting
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL keeps readers unblocked while a stage writes
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            source_file TEXT NOT NULL,
            status TEXT NOT NULL,
            manifest TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            stage TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (session_id, stage)
        );
        "#,
    )?;

    info!("Session database schema created");
    Ok(())
}
