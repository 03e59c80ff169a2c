//! Concurrent access to a shared registry

use nodekeys_core::{FamilySeed, MemoryGateway, PersistenceGateway, Wallet, WalletConfig};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

const THREADS: u32 = 8;
const PER_THREAD: u32 = 25;

fn shared_wallet() -> (Arc<MemoryGateway>, Arc<Wallet>) {
    let gateway = Arc::new(MemoryGateway::new());
    let wallet = Wallet::new(
        WalletConfig::default().with_self_check_samples(8),
        gateway.clone(),
    )
    .unwrap();
    (gateway, Arc::new(wallet))
}

#[test]
fn test_concurrent_allocation_is_gap_free() {
    let (gateway, wallet) = shared_wallet();
    let generator = wallet
        .materialize_from_seed(&FamilySeed::from_bytes([0x0c; 16]), false)
        .unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let wallet = Arc::clone(&wallet);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| wallet.allocate_new_account(&generator).unwrap().index())
                    .collect::<Vec<u32>>()
            })
        })
        .collect();

    let mut indices = BTreeSet::new();
    let mut total = 0;
    for handle in handles {
        for index in handle.join().unwrap() {
            assert!(indices.insert(index), "index {} issued twice", index);
            total += 1;
        }
    }

    let expected = THREADS * PER_THREAD;
    assert_eq!(total, expected);
    assert_eq!(indices, (0..expected).collect::<BTreeSet<_>>());
    assert_eq!(wallet.family_info(&generator).unwrap().next_seq, expected);
    assert_eq!(
        gateway.load_family(&generator).unwrap().unwrap().next_seq,
        expected
    );
}

#[test]
fn test_concurrent_lock_and_lookup() {
    let (_, wallet) = shared_wallet();
    let seed = FamilySeed::from_bytes([0x0d; 16]);
    let generator = wallet.materialize_from_seed(&seed, true).unwrap();
    let account = wallet.allocate_new_account(&generator).unwrap();
    let expected = *wallet.private_key_for(&account).unwrap().as_bytes();

    let lockers: Vec<_> = (0..4)
        .map(|i| {
            let wallet = Arc::clone(&wallet);
            let seed = seed.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    if i % 2 == 0 {
                        wallet.lock_family(&generator);
                    } else {
                        wallet.materialize_from_seed(&seed, true).unwrap();
                    }
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let wallet = Arc::clone(&wallet);
            let account = account.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    // Either absent or the full, correct key
                    if let Some(key) = wallet.private_key_for(&account) {
                        assert_eq!(*key.as_bytes(), expected);
                    }
                }
            })
        })
        .collect();

    for handle in lockers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
}
