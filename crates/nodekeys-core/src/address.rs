//! Account addresses and human-readable key encodings
//!
//! Every key kind is rendered as Base58Check: a one-byte version prefix that
//! names the kind, the payload, and a four-byte double-SHA-256 checksum.

use crate::{Error, Result};
use blake2b_simd::Params as Blake2bParams;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Personalization for account-id hashing
const ACCOUNT_ID_PERSONALIZATION: &[u8; 16] = b"NodekeysAcctId__";

/// Length of an account address in bytes
pub const ACCOUNT_ID_LENGTH: usize = 20;

/// Kinds of human-readable key material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingKind {
    /// Account address (20-byte id)
    AccountId,
    /// Account public key (compressed point)
    AccountPublic,
    /// Node public key (compressed point)
    NodePublic,
    /// Node private key (32-byte scalar)
    NodePrivate,
    /// Family generator (compressed point)
    FamilyGenerator,
    /// Family seed (16 bytes)
    FamilySeed,
}

impl EncodingKind {
    /// Version byte prefixed to the payload
    pub const fn version(self) -> u8 {
        match self {
            EncodingKind::AccountId => 0,
            EncodingKind::AccountPublic => 35,
            EncodingKind::NodePublic => 28,
            EncodingKind::NodePrivate => 32,
            EncodingKind::FamilyGenerator => 41,
            EncodingKind::FamilySeed => 33,
        }
    }

    /// Expected payload length in bytes
    pub const fn payload_len(self) -> usize {
        match self {
            EncodingKind::AccountId => ACCOUNT_ID_LENGTH,
            EncodingKind::AccountPublic
            | EncodingKind::NodePublic
            | EncodingKind::FamilyGenerator => 33,
            EncodingKind::NodePrivate => 32,
            EncodingKind::FamilySeed => 16,
        }
    }
}

/// Encode a payload of the given kind.
pub fn encode(kind: EncodingKind, payload: &[u8]) -> String {
    let mut versioned = Vec::with_capacity(1 + payload.len());
    versioned.push(kind.version());
    versioned.extend_from_slice(payload);
    bs58::encode(versioned)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

/// Decode text of the given kind, returning the payload without version byte.
pub fn decode(kind: EncodingKind, text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidEncoding(format!("empty {:?}", kind)));
    }

    let mut versioned = bs58::decode(text)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .map_err(|e| Error::InvalidEncoding(format!("{:?}: {}", kind, e)))?;

    if versioned.first() != Some(&kind.version()) {
        return Err(Error::InvalidEncoding(format!(
            "{:?}: unexpected version byte",
            kind
        )));
    }
    versioned.remove(0);

    if versioned.len() != kind.payload_len() {
        return Err(Error::InvalidEncoding(format!(
            "{:?}: expected {} bytes, got {}",
            kind,
            kind.payload_len(),
            versioned.len()
        )));
    }

    Ok(versioned)
}

/// Account address: a 20-byte hash of the account public key.
///
/// Ordering is byte order of the hash, which is the address-sort order the
/// registry scans in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; ACCOUNT_ID_LENGTH]);

impl AccountId {
    /// Hash a compressed public key into an account id
    pub fn from_public_key_bytes(public_key: &[u8]) -> Self {
        let sha = Sha256::digest(public_key);
        let hash = Blake2bParams::new()
            .hash_length(ACCOUNT_ID_LENGTH)
            .personal(ACCOUNT_ID_PERSONALIZATION)
            .hash(&sha);
        let mut id = [0u8; ACCOUNT_ID_LENGTH];
        id.copy_from_slice(hash.as_bytes());
        Self(id)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; ACCOUNT_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LENGTH] {
        &self.0
    }

    /// Human-readable form
    pub fn encode(&self) -> String {
        encode(EncodingKind::AccountId, &self.0)
    }

    /// Parse the human-readable form
    pub fn decode(text: &str) -> Result<Self> {
        let bytes = decode(EncodingKind::AccountId, text)?;
        let mut id = [0u8; ACCOUNT_ID_LENGTH];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.encode())
    }
}

impl FromStr for AccountId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::decode(&text).map_err(serde::de::Error::custom)
    }
}
