//! Property-based tests for nodekeys-core
//!
//! Uses proptest to verify derivation invariants across randomized seeds

use nodekeys_core::keys::{derive_private, derive_public, verify_derivation};
use nodekeys_core::{AccountId, FamilyGenerator, FamilySeed};
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Arbitrary 16-byte seed
fn seed_strategy() -> impl Strategy<Value = FamilySeed> {
    any::<[u8; 16]>().prop_map(FamilySeed::from_bytes)
}

/// Passphrase (0-64 chars)
fn passphrase_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ]{0,64}").unwrap()
}

// ============================================================================
// Key Derivation Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: derive_public is a pure function of (generator, index)
    #[test]
    fn prop_derive_public_deterministic(seed in seed_strategy(), index in any::<u32>()) {
        let generator = seed.generator().unwrap();
        prop_assert_eq!(
            derive_public(&generator, index).unwrap(),
            derive_public(&generator, index).unwrap()
        );
    }

    /// Property: private derivation lands on the public child
    #[test]
    fn prop_public_private_equivalence(seed in seed_strategy(), index in any::<u32>()) {
        let root = seed.root_private_key().unwrap();
        let generator = root.generator();
        let public = derive_public(&generator, index).unwrap();
        let private = derive_private(&generator, &root, index).unwrap();
        prop_assert_eq!(private.public_key().unwrap(), public);
    }

    /// Property: the same passphrase always yields the same family
    #[test]
    fn prop_passphrase_family_deterministic(passphrase in passphrase_strategy()) {
        let a = FamilySeed::from_passphrase(&passphrase).generator().unwrap();
        let b = FamilySeed::from_passphrase(&passphrase).generator().unwrap();
        prop_assert_eq!(a, b);
    }

    /// Property: generator text decodes to the same generator
    #[test]
    fn prop_generator_text_roundtrip(seed in seed_strategy()) {
        let generator = seed.generator().unwrap();
        let decoded = FamilyGenerator::decode(&generator.encode()).unwrap();
        prop_assert_eq!(decoded, generator);
    }

    /// Property: seed text decodes to the same seed
    #[test]
    fn prop_seed_text_roundtrip(seed in seed_strategy()) {
        let decoded = FamilySeed::decode(&seed.encode()).unwrap();
        prop_assert_eq!(decoded.as_bytes(), seed.as_bytes());
    }

    /// Property: account address text decodes to the same address
    #[test]
    fn prop_account_id_roundtrip(bytes in any::<[u8; 20]>()) {
        let id = AccountId::from_bytes(bytes);
        prop_assert_eq!(AccountId::decode(&id.encode()).unwrap(), id);
    }
}

// ============================================================================
// Sampled Injectivity
// ============================================================================

#[test]
fn test_derive_public_injective_over_first_thousand() {
    let generator = FamilySeed::from_bytes([0x11; 16]).generator().unwrap();
    let mut seen = HashSet::new();
    for index in 0..1000u32 {
        let key = derive_public(&generator, index).unwrap();
        assert!(seen.insert(key.serialize()), "collision at index {}", index);
    }
}

#[test]
fn test_addresses_distinct_over_first_thousand() {
    let generator = FamilySeed::from_passphrase("distinct").generator().unwrap();
    let mut seen = HashSet::new();
    for index in 0..1000u32 {
        let id = derive_public(&generator, index).unwrap().account_id();
        assert!(seen.insert(id), "address collision at index {}", index);
    }
}

#[test]
fn test_self_check_passes_default_sample() {
    let seed = FamilySeed::from_passphrase("self check");
    let root = seed.root_private_key().unwrap();
    verify_derivation(&root.generator(), &root, 500).unwrap();
}
