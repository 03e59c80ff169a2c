//! Ledger collaborator used for balance lookups

use crate::address::AccountId;
use std::collections::HashMap;

/// Reports the spendable balance of an account
pub trait BalanceSource {
    /// Effective balance of `account`; zero when the ledger has no state for it
    fn effective_balance(&self, account: &AccountId) -> u64;
}

impl BalanceSource for HashMap<AccountId, u64> {
    fn effective_balance(&self, account: &AccountId) -> u64 {
        self.get(account).copied().unwrap_or(0)
    }
}
