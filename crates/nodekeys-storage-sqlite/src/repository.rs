//! Data access layer

use crate::{models::*, Database, Result};
use rusqlite::{params, OptionalExtension, Row};

/// Repository for database operations
pub struct Repository<'a> {
    db: &'a Database,
}

fn family_from_row(row: &Row<'_>) -> rusqlite::Result<FamilyRow> {
    Ok(FamilyRow {
        generator: row.get(0)?,
        seq: row.get(1)?,
        comment: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl<'a> Repository<'a> {
    /// Create repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a family, or update seq and comment of an existing one.
    /// `created_at` of an existing row is kept.
    pub fn upsert_family(&self, family: &FamilyRow) -> Result<()> {
        self.db.conn().execute(
            "INSERT INTO local_account_families (generator, seq, comment, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(generator) DO UPDATE SET seq = excluded.seq, comment = excluded.comment",
            params![family.generator, family.seq, family.comment, family.created_at],
        )?;
        Ok(())
    }

    /// Get family by generator
    pub fn get_family(&self, generator: &str) -> Result<Option<FamilyRow>> {
        let family = self
            .db
            .conn()
            .query_row(
                "SELECT generator, seq, comment, created_at
                 FROM local_account_families WHERE generator = ?1",
                [generator],
                family_from_row,
            )
            .optional()?;
        Ok(family)
    }

    /// Get all families ordered by generator
    pub fn list_families(&self) -> Result<Vec<FamilyRow>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT generator, seq, comment, created_at
             FROM local_account_families ORDER BY generator",
        )?;
        let rows = stmt
            .query_map([], family_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Get the node identity
    pub fn get_node_identity(&self) -> Result<Option<NodeIdentityRow>> {
        let identity = self
            .db
            .conn()
            .query_row(
                "SELECT public_key, private_key, dh512, dh1024, created_at
                 FROM node_identity WHERE id = 1",
                [],
                |row| {
                    Ok(NodeIdentityRow {
                        public_key: row.get(0)?,
                        private_key: row.get::<_, String>(1)?.into(),
                        dh512: row.get(2)?,
                        dh1024: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(identity)
    }

    /// Store the node identity, replacing any previous one
    pub fn save_node_identity(&self, identity: &NodeIdentityRow) -> Result<()> {
        self.db.conn().execute(
            "INSERT OR REPLACE INTO node_identity
                 (id, public_key, private_key, dh512, dh1024, created_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                identity.public_key,
                identity.private_key.as_str(),
                identity.dh512,
                identity.dh1024,
                identity.created_at
            ],
        )?;
        Ok(())
    }
}
