//! Deterministic family key derivation
//!
//! A 16-byte family seed stretches into a root private scalar; the matching
//! public point is the family generator. Child keys are offset from the
//! generator by a hash-derived scalar, so the public half of any child can be
//! computed from the generator alone:
//!
//! ```text
//!   offset(G, i)        = H(G || i || n)           first valid scalar, n = 0, 1, ...
//!   derive_public(G, i) = G + offset(G, i) * B
//!   derive_private(G, r, i) = r + offset(G, i)     (mod curve order)
//! ```
//!
//! `H` is SHA-512 truncated to 32 bytes. Because `G = r * B`, both sides land
//! on the same point; [`verify_derivation`] checks that on a sample.

use crate::address::{self, AccountId, EncodingKind};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{All, PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::{Digest, Sha512};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use zeroize::{Zeroize, Zeroizing};

/// Length of a family seed in bytes
pub const SEED_LENGTH: usize = 16;

/// Length of a compressed public key in bytes
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Shared signing/verification context
pub(crate) static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// First 32 bytes of SHA-512 over the concatenated parts.
fn sha512_half(parts: &[&[u8]]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = hasher.finalize();
    let mut half = Zeroizing::new([0u8; 32]);
    half.copy_from_slice(&digest[..32]);
    digest.as_mut_slice().zeroize();
    half
}

/// Family seed: the secret a whole family is derived from.
#[derive(Clone)]
pub struct FamilySeed(Zeroizing<[u8; SEED_LENGTH]>);

impl FamilySeed {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SEED_LENGTH]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Generate a fresh random seed
    pub fn random() -> Self {
        let mut bytes = Zeroizing::new([0u8; SEED_LENGTH]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self(bytes)
    }

    /// Stretch a passphrase into a seed
    pub fn from_passphrase(passphrase: &str) -> Self {
        let half = sha512_half(&[passphrase.as_bytes()]);
        let mut bytes = Zeroizing::new([0u8; SEED_LENGTH]);
        bytes.copy_from_slice(&half[..SEED_LENGTH]);
        Self(bytes)
    }

    /// Get seed bytes
    pub fn as_bytes(&self) -> &[u8; SEED_LENGTH] {
        &self.0
    }

    /// Derive the root private scalar for this seed
    pub fn root_private_key(&self) -> Result<RootPrivateKey> {
        for seq in 0u32..u32::MAX {
            let candidate = sha512_half(&[&self.0[..], &seq.to_be_bytes()[..]]);
            if let Ok(mut sk) = SecretKey::from_slice(&candidate[..]) {
                let root = RootPrivateKey::from_secret(candidate, &sk);
                sk.non_secure_erase();
                return Ok(root);
            }
        }
        Err(Error::KeyDerivation(
            "seed does not produce a valid root scalar".to_string(),
        ))
    }

    /// Derive the public family generator for this seed
    pub fn generator(&self) -> Result<FamilyGenerator> {
        Ok(self.root_private_key()?.generator())
    }

    /// Human-readable form
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(address::encode(EncodingKind::FamilySeed, &self.0[..]))
    }

    /// Parse the human-readable form
    pub fn decode(text: &str) -> Result<Self> {
        let bytes = Zeroizing::new(address::decode(EncodingKind::FamilySeed, text)?);
        let mut seed = Zeroizing::new([0u8; SEED_LENGTH]);
        seed.copy_from_slice(&bytes);
        Ok(Self(seed))
    }
}

impl fmt::Debug for FamilySeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FamilySeed(<redacted>)")
    }
}

/// Stretch a passphrase into a family seed.
pub fn key_from_passphrase(passphrase: &str) -> FamilySeed {
    FamilySeed::from_passphrase(passphrase)
}

/// Generate a fresh random family seed.
pub fn generate_random_seed() -> FamilySeed {
    FamilySeed::random()
}

/// Root private scalar of a family. Zeroed on drop.
pub struct RootPrivateKey {
    scalar: Zeroizing<[u8; 32]>,
    generator: FamilyGenerator,
}

impl RootPrivateKey {
    fn from_secret(scalar: Zeroizing<[u8; 32]>, sk: &SecretKey) -> Self {
        Self {
            scalar,
            generator: FamilyGenerator::from_point(PublicKey::from_secret_key(&SECP, sk)),
        }
    }

    /// Create from raw scalar bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        let scalar = Zeroizing::new(bytes);
        let mut sk = SecretKey::from_slice(&scalar[..])
            .map_err(|e| Error::InvalidKey(format!("root scalar: {}", e)))?;
        let root = Self::from_secret(scalar, &sk);
        sk.non_secure_erase();
        Ok(root)
    }

    fn secret_key(&self) -> Result<SecretKey> {
        SecretKey::from_slice(&self.scalar[..])
            .map_err(|e| Error::InvalidKey(format!("root scalar: {}", e)))
    }

    /// Public generator matching this scalar
    pub fn generator(&self) -> FamilyGenerator {
        self.generator
    }
}

impl fmt::Debug for RootPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootPrivateKey(<redacted>)")
    }
}

/// Public generator identifying a family.
///
/// Equality, hashing and ordering use the compressed point encoding.
#[derive(Clone, Copy)]
pub struct FamilyGenerator {
    point: PublicKey,
    encoded: [u8; PUBLIC_KEY_LENGTH],
}

impl FamilyGenerator {
    fn from_point(point: PublicKey) -> Self {
        Self {
            point,
            encoded: point.serialize(),
        }
    }

    /// Create from a compressed or uncompressed point encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let point = PublicKey::from_slice(bytes)
            .map_err(|e| Error::InvalidKey(format!("family generator: {}", e)))?;
        Ok(Self::from_point(point))
    }

    /// Compressed point bytes
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.encoded
    }

    /// Human-readable form
    pub fn encode(&self) -> String {
        address::encode(EncodingKind::FamilyGenerator, &self.encoded)
    }

    /// Parse the human-readable form
    pub fn decode(text: &str) -> Result<Self> {
        let bytes = address::decode(EncodingKind::FamilyGenerator, text)?;
        Self::from_bytes(&bytes)
    }
}

impl PartialEq for FamilyGenerator {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for FamilyGenerator {}

impl Hash for FamilyGenerator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encoded.hash(state);
    }
}

impl PartialOrd for FamilyGenerator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FamilyGenerator {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encoded.cmp(&other.encoded)
    }
}

impl fmt::Display for FamilyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for FamilyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FamilyGenerator({})", self.encode())
    }
}

impl FromStr for FamilyGenerator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

/// Public key of a derived account
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AccountPublicKey(PublicKey);

impl Hash for AccountPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serialize().hash(state);
    }
}

impl AccountPublicKey {
    /// Underlying curve point
    pub fn as_point(&self) -> &PublicKey {
        &self.0
    }

    /// Compressed point bytes
    pub fn serialize(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.serialize()
    }

    /// Address of the account owning this key
    pub fn account_id(&self) -> AccountId {
        AccountId::from_public_key_bytes(&self.serialize())
    }

    /// Human-readable form
    pub fn encode(&self) -> String {
        address::encode(EncodingKind::AccountPublic, &self.serialize())
    }

    /// Parse the human-readable form
    pub fn decode(text: &str) -> Result<Self> {
        let bytes = address::decode(EncodingKind::AccountPublic, text)?;
        let point = PublicKey::from_slice(&bytes)
            .map_err(|e| Error::InvalidKey(format!("account public key: {}", e)))?;
        Ok(Self(point))
    }
}

impl fmt::Debug for AccountPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountPublicKey({})", self.encode())
    }
}

/// Private key of a derived account. Zeroed on drop.
pub struct AccountPrivateKey(Zeroizing<[u8; 32]>);

impl AccountPrivateKey {
    /// Signing key for this account
    pub fn secret_key(&self) -> Result<SecretKey> {
        SecretKey::from_slice(&self.0[..])
            .map_err(|e| Error::InvalidKey(format!("account private key: {}", e)))
    }

    /// Raw scalar bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Public key matching this private key
    pub fn public_key(&self) -> Result<AccountPublicKey> {
        let mut sk = self.secret_key()?;
        let point = PublicKey::from_secret_key(&SECP, &sk);
        sk.non_secure_erase();
        Ok(AccountPublicKey(point))
    }
}

impl fmt::Debug for AccountPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountPrivateKey(<redacted>)")
    }
}

/// Hash-derived offset scalar for child `index` of `generator`.
fn child_offset(generator: &FamilyGenerator, index: u32) -> Result<Scalar> {
    for counter in 0u32..u32::MAX {
        let candidate = sha512_half(&[
            &generator.as_bytes()[..],
            &index.to_be_bytes()[..],
            &counter.to_be_bytes()[..],
        ]);
        // SecretKey rejects zero and values at or above the curve order
        if let Ok(sk) = SecretKey::from_slice(&candidate[..]) {
            return Ok(Scalar::from(sk));
        }
    }
    Err(Error::KeyDerivation(format!(
        "no valid offset for index {}",
        index
    )))
}

/// Derive the public key of child `index` from the generator alone.
pub fn derive_public(generator: &FamilyGenerator, index: u32) -> Result<AccountPublicKey> {
    let offset = child_offset(generator, index)?;
    let point = generator
        .point
        .add_exp_tweak(&SECP, &offset)
        .map_err(|e| Error::KeyDerivation(format!("public child {}: {}", index, e)))?;
    Ok(AccountPublicKey(point))
}

/// Derive the private key of child `index` from the root scalar.
pub fn derive_private(
    generator: &FamilyGenerator,
    root: &RootPrivateKey,
    index: u32,
) -> Result<AccountPrivateKey> {
    let offset = child_offset(generator, index)?;
    let mut base = root.secret_key()?;
    let tweaked = base.add_tweak(&offset);
    base.non_secure_erase();

    let mut child = tweaked
        .map_err(|e| Error::KeyDerivation(format!("private child {}: {}", index, e)))?;
    let key = AccountPrivateKey(Zeroizing::new(child.secret_bytes()));
    child.non_secure_erase();
    Ok(key)
}

/// Check that `root` belongs to `generator` and that private and public
/// derivation agree for indices `0..samples`.
///
/// Returns the first disagreeing index as [`Error::DerivationInconsistency`];
/// a root of another family fails at index 0 whatever `samples` is.
pub fn verify_derivation(
    generator: &FamilyGenerator,
    root: &RootPrivateKey,
    samples: u32,
) -> Result<()> {
    if root.generator() != *generator {
        return Err(Error::DerivationInconsistency {
            generator: generator.encode(),
            index: 0,
        });
    }
    for index in 0..samples {
        let public = derive_public(generator, index)?;
        let from_private = derive_private(generator, root, index)?.public_key()?;
        if public != from_private {
            return Err(Error::DerivationInconsistency {
                generator: generator.encode(),
                index,
            });
        }
    }
    Ok(())
}
