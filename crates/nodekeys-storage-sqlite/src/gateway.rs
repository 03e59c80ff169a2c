//! [`PersistenceGateway`] backed by SQLite

use crate::models::{FamilyRow, NodeIdentityRow};
use crate::{Database, Error, Repository, Result};
use nodekeys_core::{
    FamilyGenerator, FamilyRecord, NodeIdentityRecord, PersistenceGateway, TransportParams,
};
use parking_lot::Mutex;
use std::path::Path;

/// Registry storage in a single SQLite database
pub struct SqliteGateway {
    db: Mutex<Database>,
}

impl SqliteGateway {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Gateway over a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    /// Wrap an already opened database
    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

fn seq_from_row(row: &FamilyRow) -> Result<u32> {
    u32::try_from(row.seq).map_err(|_| {
        Error::Validation(format!(
            "family {} has out-of-range seq {}",
            row.generator, row.seq
        ))
    })
}

fn record_from_row(row: FamilyRow) -> Result<FamilyRecord> {
    Ok(FamilyRecord {
        next_seq: seq_from_row(&row)?,
        comment: row.comment,
    })
}

fn generator_from_row(row: &FamilyRow) -> Result<FamilyGenerator> {
    FamilyGenerator::decode(&row.generator)
        .map_err(|e| Error::Validation(format!("family {}: {}", row.generator, e)))
}

impl PersistenceGateway for SqliteGateway {
    fn load_family(
        &self,
        generator: &FamilyGenerator,
    ) -> nodekeys_core::Result<Option<FamilyRecord>> {
        let db = self.db.lock();
        let row = Repository::new(&db).get_family(&generator.encode())?;
        Ok(row.map(record_from_row).transpose()?)
    }

    fn save_family(
        &self,
        generator: &FamilyGenerator,
        record: &FamilyRecord,
    ) -> nodekeys_core::Result<()> {
        let db = self.db.lock();
        Repository::new(&db).upsert_family(&FamilyRow {
            generator: generator.encode(),
            seq: i64::from(record.next_seq),
            comment: record.comment.clone(),
            created_at: chrono::Utc::now().timestamp(),
        })?;
        Ok(())
    }

    fn list_families(&self) -> nodekeys_core::Result<Vec<(FamilyGenerator, FamilyRecord)>> {
        let db = self.db.lock();
        let rows = Repository::new(&db).list_families()?;
        let mut families = Vec::with_capacity(rows.len());
        for row in rows {
            let generator = generator_from_row(&row)?;
            families.push((generator, record_from_row(row)?));
        }
        Ok(families)
    }

    fn load_node_identity(&self) -> nodekeys_core::Result<Option<NodeIdentityRecord>> {
        let db = self.db.lock();
        let row = Repository::new(&db).get_node_identity()?;
        Ok(row.map(|row| NodeIdentityRecord {
            public_key: row.public_key,
            private_key: row.private_key,
            transport: TransportParams {
                dh512: row.dh512,
                dh1024: row.dh1024,
            },
        }))
    }

    fn save_node_identity(&self, record: &NodeIdentityRecord) -> nodekeys_core::Result<()> {
        let db = self.db.lock();
        Repository::new(&db).save_node_identity(&NodeIdentityRow {
            public_key: record.public_key.clone(),
            private_key: record.private_key.clone(),
            dh512: record.transport.dh512.clone(),
            dh1024: record.transport.dh1024.clone(),
            created_at: chrono::Utc::now().timestamp(),
        })?;
        tracing::info!(node_public = %record.public_key, "Node identity stored");
        Ok(())
    }
}
