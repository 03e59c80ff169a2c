//! Key registry
//!
//! The [`Wallet`] is the sole owner of every [`AccountFamily`]. Families live
//! in a map keyed by generator; accounts refer back to their family through
//! that key. A reverse index from address to account covers every account the
//! registry has handed out.
//!
//! All registry state sits behind one mutex. Public methods take it for their
//! full duration, including calls into the persistence gateway. Families are
//! never exposed mutably outside that lock, which is what makes their own
//! unsynchronized mutation sound.

use crate::account::{Account, AccountInfo};
use crate::address::AccountId;
use crate::config::WalletConfig;
use crate::family::{AccountFamily, FamilyInfo};
use crate::keys::{AccountPrivateKey, FamilyGenerator, FamilySeed};
use crate::ledger::BalanceSource;
use crate::node_identity::{self, NodeIdentity, TransportParamSource};
use crate::persistence::{FamilyRecord, PersistenceGateway};
use crate::transaction::LocalTransactionCache;
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
struct WalletState {
    families: BTreeMap<FamilyGenerator, AccountFamily>,
    accounts: BTreeMap<AccountId, Account>,
}

impl WalletState {
    /// Family for `generator`, loading it from storage or creating it
    fn find_or_create(
        &mut self,
        gateway: &dyn PersistenceGateway,
        generator: &FamilyGenerator,
    ) -> Result<&mut AccountFamily> {
        match self.families.entry(*generator) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let family = match gateway.load_family(generator)? {
                    Some(record) => {
                        tracing::info!(
                            family = %generator,
                            next_seq = record.next_seq,
                            "Family loaded from storage"
                        );
                        AccountFamily::with_metadata(*generator, record.next_seq, record.comment)
                    }
                    None => {
                        gateway.save_family(generator, &FamilyRecord::default())?;
                        tracing::info!(family = %generator, "Family created");
                        AccountFamily::new(*generator)
                    }
                };
                Ok(entry.insert(family))
            }
        }
    }

    /// Cached account at `index`, registered in the address index
    fn account(&mut self, generator: &FamilyGenerator, index: u32) -> Result<Account> {
        let family = self
            .families
            .get_mut(generator)
            .ok_or_else(|| Error::UnknownFamily(generator.encode()))?;
        let account = family.account(index, true)?;
        self.accounts.insert(account.address(), account.clone());
        Ok(account)
    }
}

/// Registry of account families and their derived accounts
pub struct Wallet {
    config: WalletConfig,
    gateway: Arc<dyn PersistenceGateway>,
    state: Mutex<WalletState>,
    node_identity: RwLock<Option<NodeIdentity>>,
    transactions: LocalTransactionCache,
}

impl Wallet {
    /// Create an empty registry
    pub fn new(config: WalletConfig, gateway: Arc<dyn PersistenceGateway>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gateway,
            state: Mutex::new(WalletState::default()),
            node_identity: RwLock::new(None),
            transactions: LocalTransactionCache::new(),
        })
    }

    /// Registry configuration
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Rehydrate every family known to storage. Families already in memory
    /// are left alone. Returns how many were added.
    pub fn load(&self) -> Result<usize> {
        let records = self.gateway.list_families()?;
        let mut state = self.state.lock();
        let mut added = 0;
        for (generator, record) in records {
            if let Entry::Vacant(entry) = state.families.entry(generator) {
                entry.insert(AccountFamily::with_metadata(
                    generator,
                    record.next_seq,
                    record.comment,
                ));
                added += 1;
            }
        }
        tracing::info!(added, total = state.families.len(), "Families loaded");
        Ok(added)
    }

    /// Load persisted families and establish the node identity.
    ///
    /// An error here must stop the node from starting.
    pub fn start(&self, params: &dyn TransportParamSource) -> Result<NodeIdentity> {
        self.load()?;
        let identity = self.ensure_node_identity(params)?;
        tracing::info!(node_public = %identity.public_key(), "Wallet started");
        Ok(identity)
    }

    /// Find or create the family of `seed`, optionally unlocking it.
    ///
    /// # Panics
    ///
    /// Panics if the unlock self-check finds public and private derivation
    /// disagreeing (see [`AccountFamily::unlock`]).
    pub fn materialize_from_seed(&self, seed: &FamilySeed, unlock: bool) -> Result<FamilyGenerator> {
        let root = seed.root_private_key()?;
        let generator = root.generator();

        let mut state = self.state.lock();
        let family = state.find_or_create(self.gateway.as_ref(), &generator)?;
        if unlock {
            family.unlock(root, self.config.self_check_samples)?;
        }
        Ok(generator)
    }

    /// [`Wallet::materialize_from_seed`] with a seed stretched from `passphrase`
    pub fn materialize_from_passphrase(
        &self,
        passphrase: &str,
        unlock: bool,
    ) -> Result<FamilyGenerator> {
        self.materialize_from_seed(&FamilySeed::from_passphrase(passphrase), unlock)
    }

    /// Create an unlocked family from a fresh random seed.
    ///
    /// The seed is returned so the caller can back it up; the registry keeps
    /// only the root scalar.
    pub fn add_random_family(&self) -> Result<(FamilyGenerator, FamilySeed)> {
        let seed = FamilySeed::random();
        let generator = self.materialize_from_seed(&seed, true)?;
        Ok((generator, seed))
    }

    /// Find or create a family from public material only. The family is
    /// locked unless it was already unlocked by an earlier call.
    pub fn materialize_from_generator(&self, generator: &FamilyGenerator) -> Result<FamilyGenerator> {
        let mut state = self.state.lock();
        state.find_or_create(self.gateway.as_ref(), generator)?;
        Ok(*generator)
    }

    /// `generator` if the family is registered in memory
    pub fn find_by_generator(&self, generator: &FamilyGenerator) -> Option<FamilyGenerator> {
        self.state
            .lock()
            .families
            .contains_key(generator)
            .then_some(*generator)
    }

    /// Every registered family in generator order
    pub fn list_families(&self) -> Vec<FamilyGenerator> {
        self.state.lock().families.keys().copied().collect()
    }

    /// Summary of one family
    pub fn family_info(&self, generator: &FamilyGenerator) -> Option<FamilyInfo> {
        self.state
            .lock()
            .families
            .get(generator)
            .map(AccountFamily::info)
    }

    /// Read-only access to a family while the registry lock is held
    pub fn with_family<R>(
        &self,
        generator: &FamilyGenerator,
        f: impl FnOnce(&AccountFamily) -> R,
    ) -> Option<R> {
        self.state.lock().families.get(generator).map(f)
    }

    /// Replace a family's comment in storage and in memory
    pub fn set_family_comment(&self, generator: &FamilyGenerator, comment: &str) -> Result<()> {
        let mut state = self.state.lock();
        let family = state
            .families
            .get_mut(generator)
            .ok_or_else(|| Error::UnknownFamily(generator.encode()))?;

        self.gateway.save_family(
            generator,
            &FamilyRecord {
                next_seq: family.next_seq(),
                comment: comment.to_string(),
            },
        )?;
        family.set_comment(comment);
        Ok(())
    }

    /// Hand out the family's next account.
    ///
    /// The advanced sequence number is persisted before it takes effect in
    /// memory, so a failed write leaves the index unissued.
    pub fn allocate_new_account(&self, generator: &FamilyGenerator) -> Result<Account> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let family = state
            .families
            .get_mut(generator)
            .ok_or_else(|| Error::UnknownFamily(generator.encode()))?;

        let index = family.next_seq();
        let next_seq = index.checked_add(1).ok_or_else(|| {
            Error::KeyDerivation(format!("family {} has no indices left", generator))
        })?;
        let account = family.account(index, true)?;

        self.gateway.save_family(
            generator,
            &FamilyRecord {
                next_seq,
                comment: family.comment().to_string(),
            },
        )?;
        family.set_next_seq(next_seq);
        state.accounts.insert(account.address(), account.clone());

        tracing::info!(
            family = %generator,
            index,
            address = %account.address(),
            "Account allocated"
        );
        Ok(account)
    }

    /// Account at `index` without advancing the sequence. The account is
    /// cached and becomes reachable by address.
    pub fn account(&self, generator: &FamilyGenerator, index: u32) -> Option<Account> {
        match self.state.lock().account(generator, index) {
            Ok(account) => Some(account),
            Err(e) => {
                tracing::debug!(
                    family = %generator,
                    index,
                    category = %e.category(),
                    error = %e,
                    "Account lookup failed"
                );
                None
            }
        }
    }

    /// Reverse lookup of a registered account
    pub fn account_by_address(&self, address: &AccountId) -> Option<Account> {
        self.state.lock().accounts.get(address).cloned()
    }

    /// Address that `index` would have, without caching or registering it
    pub fn peek_future_address(&self, generator: &FamilyGenerator, index: u32) -> Option<AccountId> {
        let mut state = self.state.lock();
        let family = state.families.get_mut(generator)?;
        family
            .account(index, false)
            .map(|account| account.address())
            .ok()
    }

    /// Drop a family and unregister its accounts. Storage is left untouched.
    pub fn remove_family(&self, generator: &FamilyGenerator) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let family = match state.families.remove(generator) {
            Some(family) => family,
            None => return false,
        };

        for account in family.cached_accounts() {
            state.accounts.remove(&account.address());
        }
        tracing::info!(family = %generator, "Family removed");
        true
    }

    /// Wipe one family's root scalar. False if the family is unknown.
    pub fn lock_family(&self, generator: &FamilyGenerator) -> bool {
        match self.state.lock().families.get_mut(generator) {
            Some(family) => {
                family.lock();
                true
            }
            None => false,
        }
    }

    /// Wipe every root scalar
    pub fn lock_all(&self) {
        let mut state = self.state.lock();
        for family in state.families.values_mut() {
            family.lock();
        }
    }

    /// Whether a registered family is locked
    pub fn is_locked(&self, generator: &FamilyGenerator) -> Option<bool> {
        self.state
            .lock()
            .families
            .get(generator)
            .map(AccountFamily::is_locked)
    }

    /// Private key of `account`; absent while its family is locked or gone
    pub fn private_key_for(&self, account: &Account) -> Option<AccountPrivateKey> {
        let state = self.state.lock();
        let family = state.families.get(account.generator())?;
        match account.private_key(family) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::debug!(
                    address = %account.address(),
                    category = %e.category(),
                    error = %e,
                    "No private key"
                );
                None
            }
        }
    }

    /// Whether `account`'s index has been handed out by its family
    pub fn is_issued(&self, account: &Account) -> bool {
        self.state
            .lock()
            .families
            .get(account.generator())
            .map_or(false, |family| account.is_issued(family))
    }

    /// Summary of `account`, if its family is registered
    pub fn account_info(&self, account: &Account) -> Option<AccountInfo> {
        self.state
            .lock()
            .families
            .get(account.generator())
            .map(|family| account.info(family))
    }

    /// First registered account, in address order, whose family is unlocked
    /// and whose balance covers `amount`
    pub fn find_account_with_balance_at_least(
        &self,
        amount: u64,
        ledger: &dyn BalanceSource,
    ) -> Option<Account> {
        let state = self.state.lock();
        state
            .accounts
            .values()
            .find(|account| {
                state
                    .families
                    .get(account.generator())
                    .map_or(false, |family| !family.is_locked())
                    && ledger.effective_balance(&account.address()) >= amount
            })
            .cloned()
    }

    /// Resolve `<address>` or `<generator>:<index>` to an account.
    ///
    /// Malformed or unknown input yields `None`. A seed may stand in for the
    /// generator; it is only used to compute the generator.
    pub fn parse_account_specifier(&self, text: &str) -> Option<Account> {
        match self.resolve_specifier(text) {
            Ok(account) => Some(account),
            Err(e) => {
                tracing::debug!(category = %e.category(), error = %e, "Account specifier not resolved");
                None
            }
        }
    }

    fn resolve_specifier(&self, text: &str) -> Result<Account> {
        let Some((family_part, index_part)) = text.split_once(':') else {
            let address = AccountId::decode(text)
                .map_err(|e| Error::MalformedSpecifier(e.to_string()))?;
            return self
                .account_by_address(&address)
                .ok_or_else(|| Error::UnknownFamily(format!("no account {}", address)));
        };

        if family_part.is_empty() {
            return Err(Error::MalformedSpecifier("empty family".to_string()));
        }
        if index_part.is_empty() || !index_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::MalformedSpecifier(format!("bad index {:?}", index_part)));
        }
        let index: u32 = index_part
            .parse()
            .map_err(|_| Error::MalformedSpecifier(format!("index out of range {:?}", index_part)))?;

        let generator = match FamilyGenerator::decode(family_part) {
            Ok(generator) => generator,
            Err(_) => FamilySeed::decode(family_part)
                .and_then(|seed| seed.generator())
                .map_err(|_| Error::MalformedSpecifier("unrecognized family".to_string()))?,
        };

        self.state.lock().account(&generator, index)
    }

    /// The node identity, loading or creating it on first call
    pub fn ensure_node_identity(&self, params: &dyn TransportParamSource) -> Result<NodeIdentity> {
        let mut slot = self.node_identity.write();
        if let Some(identity) = slot.as_ref() {
            return Ok(identity.clone());
        }

        let identity = node_identity::ensure_node_identity(self.gateway.as_ref(), params)?;
        *slot = Some(identity.clone());
        Ok(identity)
    }

    /// The node identity, if already established
    pub fn node_identity(&self) -> Option<NodeIdentity> {
        self.node_identity.read().clone()
    }

    /// Transactions observed for local accounts
    pub fn transactions(&self) -> &LocalTransactionCache {
        &self.transactions
    }
}
