//! Database schema migrations

use crate::{Error, Result};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Run all migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::debug!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Running migrations"
    );

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version != SCHEMA_VERSION {
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Highest recorded schema version, 0 for a fresh database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    match result {
        Ok(v) => Ok(v),
        Err(_) => Ok(0),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    if inserted > 0 {
        tracing::debug!(version, "Inserted schema version");
    }
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS local_account_families (
            generator TEXT PRIMARY KEY,
            seq INTEGER NOT NULL DEFAULT 0,
            comment TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS node_identity (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            public_key TEXT NOT NULL,
            private_key TEXT NOT NULL,
            dh512 TEXT NOT NULL,
            dh1024 TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| Error::Migration(format!("v1: {}", e)))?;

    tracing::info!("Applied schema migration v1");
    Ok(())
}
