//! Node key registry core
//!
//! This crate implements deterministic account-family key derivation, the
//! human-readable key codecs, the account registry and the node's network
//! identity. Storage is reached through [`PersistenceGateway`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod address;
pub mod config;
pub mod error;
pub mod family;
pub mod keys;
pub mod ledger;
pub mod node_identity;
pub mod persistence;
pub mod transaction;
pub mod wallet;

pub use account::{Account, AccountInfo};
pub use address::{AccountId, EncodingKind, ACCOUNT_ID_LENGTH};
pub use config::{WalletConfig, DEFAULT_SELF_CHECK_SAMPLES, SELF_CHECK_SAMPLES_ENV};
pub use error::{Error, ErrorCategory, Result};
pub use family::{AccountFamily, FamilyInfo};
pub use keys::{
    derive_private, derive_public, generate_random_seed, key_from_passphrase, verify_derivation,
    AccountPrivateKey, AccountPublicKey, FamilyGenerator, FamilySeed, RootPrivateKey,
    PUBLIC_KEY_LENGTH, SEED_LENGTH,
};
pub use ledger::BalanceSource;
pub use node_identity::{
    ensure_node_identity, NodeIdentity, NodePrivateKey, NodePublicKey, StaticTransportParams,
    TransportParamSource,
};
pub use persistence::{
    FamilyRecord, MemoryGateway, NodeIdentityRecord, PersistenceGateway, TransportParams,
};
pub use transaction::{LocalTransaction, LocalTransactionCache, TxId};
pub use wallet::Wallet;

#[cfg(any(test, feature = "test-helpers"))]
pub use persistence::{DiscardingGateway, FailingGateway};
