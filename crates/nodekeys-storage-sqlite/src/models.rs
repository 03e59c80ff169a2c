//! Database models

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Account family row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRow {
    /// Family generator (human-readable)
    pub generator: String,
    /// Next unassigned sequence index
    pub seq: i64,
    /// Family comment
    pub comment: String,
    /// Created timestamp
    pub created_at: i64,
}

/// Node identity row. There is at most one.
#[derive(Clone)]
pub struct NodeIdentityRow {
    /// Node public key (human-readable)
    pub public_key: String,
    /// Node private key (human-readable)
    pub private_key: Zeroizing<String>,
    /// 512-bit DH parameters
    pub dh512: String,
    /// 1024-bit DH parameters
    pub dh1024: String,
    /// Created timestamp
    pub created_at: i64,
}

impl fmt::Debug for NodeIdentityRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIdentityRow")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("dh512", &self.dh512)
            .field("dh1024", &self.dh1024)
            .field("created_at", &self.created_at)
            .finish()
    }
}
