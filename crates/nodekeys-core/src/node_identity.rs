//! Node network identity
//!
//! The node's long-term keypair is generated once from fresh randomness,
//! persisted, and loaded on every later start. It is unrelated to any
//! account family.

use crate::address::{self, EncodingKind};
use crate::keys::SECP;
use crate::persistence::{NodeIdentityRecord, PersistenceGateway, TransportParams};
use crate::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey, SecretKey};
use std::fmt;
use zeroize::Zeroizing;

/// Source of transport key-exchange parameters for a new identity
pub trait TransportParamSource: Send + Sync {
    /// Produce parameters for a freshly created identity
    fn generate(&self) -> Result<TransportParams>;
}

/// Hands out a fixed set of parameters
#[derive(Debug, Clone, Default)]
pub struct StaticTransportParams(pub TransportParams);

impl TransportParamSource for StaticTransportParams {
    fn generate(&self) -> Result<TransportParams> {
        Ok(self.0.clone())
    }
}

/// Node public key
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NodePublicKey(PublicKey);

impl NodePublicKey {
    /// Underlying curve point
    pub fn as_point(&self) -> &PublicKey {
        &self.0
    }

    /// Human-readable form
    pub fn encode(&self) -> String {
        address::encode(EncodingKind::NodePublic, &self.0.serialize())
    }

    /// Parse the human-readable form
    pub fn decode(text: &str) -> Result<Self> {
        let bytes = address::decode(EncodingKind::NodePublic, text)?;
        PublicKey::from_slice(&bytes)
            .map(Self)
            .map_err(|e| Error::InvalidKey(format!("node public key: {}", e)))
    }
}

impl fmt::Display for NodePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for NodePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePublicKey({})", self.encode())
    }
}

/// Node private key. Zeroed on drop.
#[derive(Clone)]
pub struct NodePrivateKey(Zeroizing<[u8; 32]>);

impl NodePrivateKey {
    fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        loop {
            OsRng.fill_bytes(&mut bytes[..]);
            if let Ok(mut sk) = SecretKey::from_slice(&bytes[..]) {
                sk.non_secure_erase();
                return Self(bytes);
            }
        }
    }

    /// Signing key
    pub fn secret_key(&self) -> Result<SecretKey> {
        SecretKey::from_slice(&self.0[..])
            .map_err(|e| Error::InvalidKey(format!("node private key: {}", e)))
    }

    /// Matching public key
    pub fn public_key(&self) -> Result<NodePublicKey> {
        let mut sk = self.secret_key()?;
        let point = PublicKey::from_secret_key(&SECP, &sk);
        sk.non_secure_erase();
        Ok(NodePublicKey(point))
    }

    /// Human-readable form
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(address::encode(EncodingKind::NodePrivate, &self.0[..]))
    }

    /// Parse the human-readable form
    pub fn decode(text: &str) -> Result<Self> {
        let bytes = Zeroizing::new(address::decode(EncodingKind::NodePrivate, text)?);
        let mut scalar = Zeroizing::new([0u8; 32]);
        scalar.copy_from_slice(&bytes);
        let key = Self(scalar);
        key.secret_key()?.non_secure_erase();
        Ok(key)
    }
}

impl fmt::Debug for NodePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodePrivateKey(<redacted>)")
    }
}

/// The node's long-term network identity
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    public_key: NodePublicKey,
    private_key: NodePrivateKey,
    transport: TransportParams,
}

impl NodeIdentity {
    /// Create a fresh random identity
    pub fn generate(transport: TransportParams) -> Result<Self> {
        let private_key = NodePrivateKey::generate();
        Ok(Self {
            public_key: private_key.public_key()?,
            private_key,
            transport,
        })
    }

    /// Decode a stored identity, checking the keys belong together
    pub fn from_record(record: &NodeIdentityRecord) -> Result<Self> {
        let corrupt =
            |e: Error| Error::PersistenceUnavailable(format!("stored node identity: {}", e));

        let public_key = NodePublicKey::decode(&record.public_key).map_err(corrupt)?;
        let private_key = NodePrivateKey::decode(&record.private_key).map_err(corrupt)?;
        if private_key.public_key().map_err(corrupt)? != public_key {
            return Err(Error::PersistenceUnavailable(
                "stored node identity: public key does not match private key".to_string(),
            ));
        }

        Ok(Self {
            public_key,
            private_key,
            transport: record.transport.clone(),
        })
    }

    /// Encode for storage
    pub fn to_record(&self) -> NodeIdentityRecord {
        NodeIdentityRecord {
            public_key: self.public_key.encode(),
            private_key: self.private_key.encode(),
            transport: self.transport.clone(),
        }
    }

    /// Node public key
    pub fn public_key(&self) -> &NodePublicKey {
        &self.public_key
    }

    /// Node private key
    pub fn private_key(&self) -> &NodePrivateKey {
        &self.private_key
    }

    /// Transport parameters
    pub fn transport(&self) -> &TransportParams {
        &self.transport
    }
}

fn load(gateway: &dyn PersistenceGateway) -> Result<Option<NodeIdentity>> {
    gateway
        .load_node_identity()?
        .map(|record| NodeIdentity::from_record(&record))
        .transpose()
}

/// Load the persisted identity, creating and storing one on first start.
///
/// Any error is fatal for startup: a node without a stable identity must not
/// join the network.
pub fn ensure_node_identity(
    gateway: &dyn PersistenceGateway,
    params: &dyn TransportParamSource,
) -> Result<NodeIdentity> {
    if let Some(identity) = load(gateway)? {
        return Ok(identity);
    }

    tracing::info!("NodeIdentity: creating");
    let identity = NodeIdentity::generate(params.generate()?)?;
    gateway.save_node_identity(&identity.to_record())?;
    tracing::info!(node_public = %identity.public_key(), "NodeIdentity: created");

    load(gateway)?.ok_or_else(|| {
        tracing::error!("NodeIdentity: stored identity could not be read back");
        Error::PersistenceUnavailable("unable to retrieve new node identity".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{DiscardingGateway, FailingGateway, MemoryGateway};

    #[test]
    fn test_generate_is_random() {
        let a = NodeIdentity::generate(TransportParams::default()).unwrap();
        let b = NodeIdentity::generate(TransportParams::default()).unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_record_roundtrip() {
        let identity = NodeIdentity::generate(TransportParams {
            dh512: "aa".to_string(),
            dh1024: "bb".to_string(),
        })
        .unwrap();
        let restored = NodeIdentity::from_record(&identity.to_record()).unwrap();
        assert_eq!(restored.public_key(), identity.public_key());
        assert_eq!(restored.transport().dh1024, "bb");
    }

    #[test]
    fn test_mismatched_record_rejected() {
        let a = NodeIdentity::generate(TransportParams::default()).unwrap();
        let b = NodeIdentity::generate(TransportParams::default()).unwrap();
        let mut record = a.to_record();
        record.private_key = b.to_record().private_key;
        assert!(matches!(
            NodeIdentity::from_record(&record),
            Err(Error::PersistenceUnavailable(_))
        ));
    }

    #[test]
    fn test_ensure_creates_then_reloads() {
        let gateway = MemoryGateway::new();
        let params = StaticTransportParams::default();
        let first = ensure_node_identity(&gateway, &params).unwrap();
        let second = ensure_node_identity(&gateway, &params).unwrap();
        assert_eq!(first.public_key(), second.public_key());
    }

    #[test]
    fn test_ensure_fails_when_identity_not_persisted() {
        let err = ensure_node_identity(&DiscardingGateway, &StaticTransportParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::PersistenceUnavailable(_)));
    }

    #[test]
    fn test_ensure_fails_when_gateway_offline() {
        assert!(ensure_node_identity(&FailingGateway, &StaticTransportParams::default()).is_err());
    }
}
