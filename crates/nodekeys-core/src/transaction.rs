//! Cache of transactions touching local accounts
//!
//! Filled and consulted by the ledger layer. Nothing here interprets the
//! transactions; the cache only records what the ledger reported.

use crate::address::AccountId;
use crate::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Transaction identifier (32-byte hash)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId([u8; 32]);

impl TxId {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", hex::encode(self.0))
    }
}

impl FromStr for TxId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| Error::InvalidEncoding(format!("transaction id: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::InvalidEncoding("transaction id must be 32 bytes".to_string())
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for TxId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A locally observed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTransaction {
    /// Transaction id
    pub id: TxId,
    /// Local account the transaction touches
    pub account: AccountId,
    /// Amount moved
    pub amount: u64,
    /// The local account has been debited for it
    pub paid: bool,
    /// The local account has been credited by it
    pub credited: bool,
}

impl LocalTransaction {
    /// New entry, neither paid nor credited
    pub fn new(id: TxId, account: AccountId, amount: u64) -> Self {
        Self {
            id,
            account,
            amount,
            paid: false,
            credited: false,
        }
    }
}

/// Concurrent map of local transactions keyed by id
#[derive(Debug, Default)]
pub struct LocalTransactionCache {
    entries: RwLock<BTreeMap<TxId, LocalTransaction>>,
}

impl LocalTransactionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning the previous one
    pub fn insert(&self, tx: LocalTransaction) -> Option<LocalTransaction> {
        self.entries.write().insert(tx.id, tx)
    }

    /// Entry for `id`
    pub fn get(&self, id: &TxId) -> Option<LocalTransaction> {
        self.entries.read().get(id).cloned()
    }

    /// Remove the entry for `id`
    pub fn remove(&self, id: &TxId) -> Option<LocalTransaction> {
        self.entries.write().remove(id)
    }

    /// Set the paid flag; false if `id` is not cached
    pub fn set_paid(&self, id: &TxId, paid: bool) -> bool {
        match self.entries.write().get_mut(id) {
            Some(tx) => {
                tx.paid = paid;
                true
            }
            None => false,
        }
    }

    /// Set the credited flag; false if `id` is not cached
    pub fn set_credited(&self, id: &TxId, credited: bool) -> bool {
        match self.entries.write().get_mut(id) {
            Some(tx) => {
                tx.credited = credited;
                true
            }
            None => false,
        }
    }

    /// Entries touching `account`, in id order
    pub fn for_account(&self, account: &AccountId) -> Vec<LocalTransaction> {
        self.entries
            .read()
            .values()
            .filter(|tx| &tx.account == account)
            .cloned()
            .collect()
    }

    /// All entries in id order
    pub fn all(&self) -> Vec<LocalTransaction> {
        self.entries.read().values().cloned().collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
