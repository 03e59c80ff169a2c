//! Account families
//!
//! An [`AccountFamily`] owns one generator, the next unassigned sequence
//! number, a comment, an optional unlocked root scalar and the cache of
//! accounts derived so far.
//!
//! The family has no lock of its own. Every mutating method takes `&mut self`;
//! inside the registry the only way to obtain that is through the registry's
//! mutex, so cache insertion, sequence advancement and lock/unlock are
//! serialized with every other registry operation.

use crate::account::Account;
use crate::keys::{self, AccountPrivateKey, FamilyGenerator, RootPrivateKey};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sequence of accounts derived from one generator
pub struct AccountFamily {
    generator: FamilyGenerator,
    next_seq: u32,
    comment: String,
    root: Option<RootPrivateKey>,
    accounts: BTreeMap<u32, Account>,
}

impl AccountFamily {
    /// Create a locked family with no accounts issued
    pub fn new(generator: FamilyGenerator) -> Self {
        Self::with_metadata(generator, 0, String::new())
    }

    /// Create a locked family from persisted metadata
    pub fn with_metadata(generator: FamilyGenerator, next_seq: u32, comment: String) -> Self {
        Self {
            generator,
            next_seq,
            comment,
            root: None,
            accounts: BTreeMap::new(),
        }
    }

    /// Family generator
    pub fn generator(&self) -> &FamilyGenerator {
        &self.generator
    }

    /// Next unassigned sequence index
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Set the next unassigned sequence index.
    ///
    /// Not checked for monotonicity; the registry only ever moves it forward.
    pub fn set_next_seq(&mut self, next_seq: u32) {
        self.next_seq = next_seq;
    }

    /// Family comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Replace the family comment
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Whether the root scalar is absent
    pub fn is_locked(&self) -> bool {
        self.root.is_none()
    }

    /// Load the root scalar and verify derivation on `samples` indices.
    ///
    /// An already-unlocked family keeps its existing scalar. The root must
    /// belong to this family's generator even when `samples` is zero.
    ///
    /// # Panics
    ///
    /// Panics if the root does not match the generator or if public and
    /// private derivation disagree. Key material from either side can no
    /// longer be trusted, so the process must not continue. The root is
    /// wiped before the panic and never stored.
    pub fn unlock(&mut self, root: RootPrivateKey, samples: u32) -> Result<()> {
        if self.root.is_some() {
            tracing::debug!(family = %self.generator, "Family already unlocked");
            return Ok(());
        }

        tracing::debug!(family = %self.generator, samples, "Checking family derivation");
        if let Err(e) = keys::verify_derivation(&self.generator, &root, samples) {
            drop(root);
            tracing::error!(
                family = %self.generator,
                category = %e.category(),
                error = %e,
                "Family key mismatch, refusing to unlock"
            );
            if e.is_fatal() {
                panic!("Family {} failed derivation self-check: {}", self.generator, e);
            }
            return Err(e);
        }

        self.root = Some(root);
        tracing::info!(family = %self.generator, "Family unlocked");
        Ok(())
    }

    /// Wipe the root scalar. Idempotent.
    pub fn lock(&mut self) {
        if self.root.take().is_some() {
            tracing::info!(family = %self.generator, "Family locked");
        }
    }

    /// Account at `index`.
    ///
    /// With `cache` set the account is stored in (or fetched from) the family
    /// cache; otherwise a throw-away value is derived and the cache is left
    /// untouched.
    pub fn account(&mut self, index: u32, cache: bool) -> Result<Account> {
        if let Some(account) = self.accounts.get(&index) {
            return Ok(account.clone());
        }

        let account = Account::derive(&self.generator, index)?;
        if cache {
            self.accounts.insert(index, account.clone());
        }
        Ok(account)
    }

    /// Cached account at `index`, if it has been derived with caching
    pub fn cached_account(&self, index: u32) -> Option<&Account> {
        self.accounts.get(&index)
    }

    /// All cached accounts in index order
    pub fn cached_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Private key of child `index`; fails with [`Error::KeyLocked`] while locked
    pub fn private_key_for(&self, index: u32) -> Result<AccountPrivateKey> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| Error::KeyLocked(self.generator.encode()))?;
        tracing::debug!(family = %self.generator, index, "Deriving private key");
        keys::derive_private(&self.generator, root, index)
    }

    /// Serializable summary of this family
    pub fn info(&self) -> FamilyInfo {
        FamilyInfo {
            generator: self.generator.encode(),
            comment: self.comment.clone(),
            next_seq: self.next_seq,
            is_locked: self.is_locked(),
        }
    }
}

impl Drop for AccountFamily {
    fn drop(&mut self) {
        self.lock();
    }
}

/// Family summary for API responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyInfo {
    /// Family generator (human-readable)
    pub generator: String,
    /// Family comment
    pub comment: String,
    /// Next unassigned sequence index
    pub next_seq: u32,
    /// Root scalar is not loaded
    pub is_locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::FamilySeed;

    const SAMPLES: u32 = 16;

    fn seed() -> FamilySeed {
        FamilySeed::from_bytes([0x5a; 16])
    }

    #[test]
    fn test_new_family_is_locked() {
        let family = AccountFamily::new(seed().generator().unwrap());
        assert!(family.is_locked());
        assert_eq!(family.next_seq(), 0);
        assert_eq!(family.cached_accounts().count(), 0);
    }

    #[test]
    fn test_unlock_then_lock() {
        let seed = seed();
        let mut family = AccountFamily::new(seed.generator().unwrap());

        family.unlock(seed.root_private_key().unwrap(), SAMPLES).unwrap();
        assert!(!family.is_locked());
        assert!(family.private_key_for(4).is_ok());

        family.lock();
        assert!(family.is_locked());
        assert!(matches!(family.private_key_for(4), Err(Error::KeyLocked(_))));

        // Idempotent
        family.lock();
        assert!(family.is_locked());
    }

    #[test]
    fn test_unlock_does_not_overwrite() {
        let seed = seed();
        let mut family = AccountFamily::new(seed.generator().unwrap());
        family.unlock(seed.root_private_key().unwrap(), SAMPLES).unwrap();
        let before = *family.private_key_for(0).unwrap().as_bytes();

        // A foreign root is ignored while unlocked
        let foreign = FamilySeed::from_bytes([0x01; 16]).root_private_key().unwrap();
        family.unlock(foreign, SAMPLES).unwrap();
        assert_eq!(*family.private_key_for(0).unwrap().as_bytes(), before);
    }

    #[test]
    #[should_panic(expected = "failed derivation self-check")]
    fn test_unlock_with_wrong_root_aborts() {
        let mut family = AccountFamily::new(seed().generator().unwrap());
        let foreign = FamilySeed::from_bytes([0x01; 16]).root_private_key().unwrap();
        let _ = family.unlock(foreign, SAMPLES);
    }

    #[test]
    #[should_panic(expected = "failed derivation self-check")]
    fn test_unlock_with_wrong_root_aborts_without_samples() {
        let mut family = AccountFamily::new(seed().generator().unwrap());
        let foreign = FamilySeed::from_bytes([0x01; 16]).root_private_key().unwrap();
        let _ = family.unlock(foreign, 0);
    }

    #[test]
    fn test_wrong_root_is_never_stored() {
        let mut family = AccountFamily::new(seed().generator().unwrap());
        let foreign = FamilySeed::from_bytes([0x01; 16]).root_private_key().unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = family.unlock(foreign, 0);
        }));
        assert!(result.is_err());
        assert!(family.is_locked());
        assert!(matches!(family.private_key_for(0), Err(Error::KeyLocked(_))));
    }

    #[test]
    fn test_unlock_without_samples_accepts_own_root() {
        let seed = seed();
        let mut family = AccountFamily::new(seed.generator().unwrap());
        family.unlock(seed.root_private_key().unwrap(), 0).unwrap();

        let account = family.account(0, false).unwrap();
        let private = family.private_key_for(0).unwrap();
        assert_eq!(&private.public_key().unwrap(), account.public_key());
    }

    #[test]
    fn test_peek_does_not_cache() {
        let mut family = AccountFamily::new(seed().generator().unwrap());
        let peeked = family.account(9, false).unwrap();
        assert!(family.cached_account(9).is_none());

        let cached = family.account(9, true).unwrap();
        assert_eq!(peeked.address(), cached.address());
        assert!(family.cached_account(9).is_some());
    }

    #[test]
    fn test_cached_accounts_match_public_derivation() {
        let mut family = AccountFamily::new(seed().generator().unwrap());
        for index in 0..10 {
            family.account(index, true).unwrap();
        }
        for account in family.cached_accounts() {
            let expected = keys::derive_public(family.generator(), account.index()).unwrap();
            assert_eq!(account.public_key(), &expected);
        }
    }

    #[test]
    fn test_info() {
        let family =
            AccountFamily::with_metadata(seed().generator().unwrap(), 7, "savings".to_string());
        let info = family.info();
        assert_eq!(info.next_seq, 7);
        assert_eq!(info.comment, "savings");
        assert!(info.is_locked);
    }
}
