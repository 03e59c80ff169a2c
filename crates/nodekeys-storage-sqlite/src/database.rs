//! Database connection and initialization

use crate::{migrations, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database file, enable WAL and run migrations
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        migrations::run_migrations(&conn)?;
        tracing::debug!(path = %path.as_ref().display(), "Database opened");
        Ok(Self { conn })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Get connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_runs_migrations() {
        let db = Database::open_in_memory().unwrap();
        let version = migrations::get_schema_version(db.conn()).unwrap();
        assert_eq!(version, migrations::SCHEMA_VERSION);
    }
}
