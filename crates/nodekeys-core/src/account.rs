//! Derived accounts
//!
//! An [`Account`] is a read-only view of one `(family, index)` pair. It holds
//! the family generator as a key rather than a reference; anything that needs
//! family state (the issued flag, the private key) takes the owning
//! [`AccountFamily`] explicitly.

use crate::address::AccountId;
use crate::family::AccountFamily;
use crate::keys::{self, AccountPrivateKey, AccountPublicKey, FamilyGenerator};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single derived account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    generator: FamilyGenerator,
    index: u32,
    public_key: AccountPublicKey,
    address: AccountId,
}

impl Account {
    /// Derive the account at `index` of the family identified by `generator`
    pub fn derive(generator: &FamilyGenerator, index: u32) -> Result<Self> {
        let public_key = keys::derive_public(generator, index)?;
        Ok(Self {
            generator: *generator,
            index,
            address: public_key.account_id(),
            public_key,
        })
    }

    /// Generator of the owning family
    pub fn generator(&self) -> &FamilyGenerator {
        &self.generator
    }

    /// Sequence index within the family
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Account address
    pub fn address(&self) -> AccountId {
        self.address
    }

    /// Account public key
    pub fn public_key(&self) -> &AccountPublicKey {
        &self.public_key
    }

    /// `<generator>:<index>` specifier naming this account
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.generator.encode(), self.index)
    }

    /// Whether the family has already handed out this index
    pub fn is_issued(&self, family: &AccountFamily) -> bool {
        family.generator() == &self.generator && self.index < family.next_seq()
    }

    /// Private key, if the owning family is unlocked
    pub fn private_key(&self, family: &AccountFamily) -> Result<AccountPrivateKey> {
        if family.generator() != &self.generator {
            return Err(Error::UnknownFamily(format!(
                "account {} does not belong to family {}",
                self.address,
                family.generator()
            )));
        }
        family.private_key_for(self.index)
    }

    /// Serializable summary of this account
    pub fn info(&self, family: &AccountFamily) -> AccountInfo {
        AccountInfo {
            family: self.generator.encode(),
            address: self.address,
            public_key: self.public_key.encode(),
            full_name: self.full_name(),
            issued: self.is_issued(family),
            is_locked: family.is_locked(),
        }
    }
}

/// Account summary for API responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Family generator (human-readable)
    pub family: String,
    /// Account address
    pub address: AccountId,
    /// Account public key (human-readable)
    pub public_key: String,
    /// `<generator>:<index>`
    pub full_name: String,
    /// Index already allocated by the family
    pub issued: bool,
    /// Owning family is locked
    pub is_locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::FamilySeed;

    fn family() -> (FamilySeed, AccountFamily) {
        let seed = FamilySeed::from_bytes([0x21; 16]);
        let family = AccountFamily::new(seed.generator().unwrap());
        (seed, family)
    }

    #[test]
    fn test_full_name() {
        let (_, family) = family();
        let account = Account::derive(family.generator(), 3).unwrap();
        assert_eq!(
            account.full_name(),
            format!("{}:3", family.generator().encode())
        );
    }

    #[test]
    fn test_issued_follows_next_seq() {
        let (_, mut family) = family();
        let account = Account::derive(family.generator(), 2).unwrap();
        assert!(!account.is_issued(&family));
        family.set_next_seq(3);
        assert!(account.is_issued(&family));
    }

    #[test]
    fn test_private_key_requires_unlock() {
        let (seed, mut family) = family();
        let account = Account::derive(family.generator(), 0).unwrap();
        assert!(matches!(
            account.private_key(&family),
            Err(Error::KeyLocked(_))
        ));

        family.unlock(seed.root_private_key().unwrap(), 8).unwrap();
        let private = account.private_key(&family).unwrap();
        assert_eq!(&private.public_key().unwrap(), account.public_key());
    }

    #[test]
    fn test_foreign_family_rejected() {
        let (_, family) = family();
        let other = AccountFamily::new(FamilySeed::from_bytes([0x22; 16]).generator().unwrap());
        let account = Account::derive(family.generator(), 0).unwrap();
        assert!(!account.is_issued(&other));
        assert!(account.private_key(&other).is_err());
    }

    #[test]
    fn test_info_serializes() {
        let (_, family) = family();
        let account = Account::derive(family.generator(), 1).unwrap();
        let info = account.info(&family);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["full_name"], account.full_name());
        assert_eq!(json["is_locked"], true);
        assert_eq!(json["issued"], false);
    }
}
