//! Persistence gateway
//!
//! The registry stores family metadata and the node identity through this
//! trait. Calls are made while the registry lock is held, so implementations
//! should return quickly.

use crate::keys::FamilyGenerator;
use crate::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroizing;

/// Persisted family metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRecord {
    /// Next unassigned sequence index
    pub next_seq: u32,
    /// Family comment
    pub comment: String,
}

/// Transport key-exchange parameters stored alongside the node identity.
///
/// Opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportParams {
    /// 512-bit Diffie-Hellman parameters (hex DER)
    pub dh512: String,
    /// 1024-bit Diffie-Hellman parameters (hex DER)
    pub dh1024: String,
}

/// Persisted node identity, human-encoded
#[derive(Clone)]
pub struct NodeIdentityRecord {
    /// Node public key
    pub public_key: String,
    /// Node private key
    pub private_key: Zeroizing<String>,
    /// Transport parameters
    pub transport: TransportParams,
}

impl fmt::Debug for NodeIdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIdentityRecord")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("transport", &self.transport)
            .finish()
    }
}

/// Storage for family metadata and the node identity
pub trait PersistenceGateway: Send + Sync {
    /// Metadata for one family, if stored
    fn load_family(&self, generator: &FamilyGenerator) -> Result<Option<FamilyRecord>>;

    /// Insert or replace the metadata for one family
    fn save_family(&self, generator: &FamilyGenerator, record: &FamilyRecord) -> Result<()>;

    /// Every stored family
    fn list_families(&self) -> Result<Vec<(FamilyGenerator, FamilyRecord)>>;

    /// The stored node identity, if any
    fn load_node_identity(&self) -> Result<Option<NodeIdentityRecord>>;

    /// Store the node identity
    fn save_node_identity(&self, record: &NodeIdentityRecord) -> Result<()>;
}

/// Process-local gateway that keeps everything in memory
#[derive(Default)]
pub struct MemoryGateway {
    families: Mutex<BTreeMap<FamilyGenerator, FamilyRecord>>,
    node_identity: Mutex<Option<NodeIdentityRecord>>,
}

impl MemoryGateway {
    /// Create an empty gateway
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load_family(&self, generator: &FamilyGenerator) -> Result<Option<FamilyRecord>> {
        Ok(self.families.lock().get(generator).cloned())
    }

    fn save_family(&self, generator: &FamilyGenerator, record: &FamilyRecord) -> Result<()> {
        self.families.lock().insert(*generator, record.clone());
        Ok(())
    }

    fn list_families(&self) -> Result<Vec<(FamilyGenerator, FamilyRecord)>> {
        Ok(self
            .families
            .lock()
            .iter()
            .map(|(generator, record)| (*generator, record.clone()))
            .collect())
    }

    fn load_node_identity(&self) -> Result<Option<NodeIdentityRecord>> {
        Ok(self.node_identity.lock().clone())
    }

    fn save_node_identity(&self, record: &NodeIdentityRecord) -> Result<()> {
        *self.node_identity.lock() = Some(record.clone());
        Ok(())
    }
}

/// Gateway whose every call fails
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct FailingGateway;

#[cfg(any(test, feature = "test-helpers"))]
impl PersistenceGateway for FailingGateway {
    fn load_family(&self, _generator: &FamilyGenerator) -> Result<Option<FamilyRecord>> {
        Err(crate::Error::PersistenceUnavailable("gateway offline".to_string()))
    }

    fn save_family(&self, _generator: &FamilyGenerator, _record: &FamilyRecord) -> Result<()> {
        Err(crate::Error::PersistenceUnavailable("gateway offline".to_string()))
    }

    fn list_families(&self) -> Result<Vec<(FamilyGenerator, FamilyRecord)>> {
        Err(crate::Error::PersistenceUnavailable("gateway offline".to_string()))
    }

    fn load_node_identity(&self) -> Result<Option<NodeIdentityRecord>> {
        Err(crate::Error::PersistenceUnavailable("gateway offline".to_string()))
    }

    fn save_node_identity(&self, _record: &NodeIdentityRecord) -> Result<()> {
        Err(crate::Error::PersistenceUnavailable("gateway offline".to_string()))
    }
}

/// Gateway that accepts writes and forgets them
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct DiscardingGateway;

#[cfg(any(test, feature = "test-helpers"))]
impl PersistenceGateway for DiscardingGateway {
    fn load_family(&self, _generator: &FamilyGenerator) -> Result<Option<FamilyRecord>> {
        Ok(None)
    }

    fn save_family(&self, _generator: &FamilyGenerator, _record: &FamilyRecord) -> Result<()> {
        Ok(())
    }

    fn list_families(&self) -> Result<Vec<(FamilyGenerator, FamilyRecord)>> {
        Ok(Vec::new())
    }

    fn load_node_identity(&self) -> Result<Option<NodeIdentityRecord>> {
        Ok(None)
    }

    fn save_node_identity(&self, _record: &NodeIdentityRecord) -> Result<()> {
        Ok(())
    }
}
