//! Prepaid balance ledger.
//!
//! The engine settles every confirmed order item against an account balance
//! through this adapter. The check-and-debit must be atomic: two concurrent
//! item executions for the same account must never both pass the balance
//! check when only one can be afforded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::info;

use namegrid_core::AccountId;

/// Ledger operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),

    #[error("ledger storage failure: {0}")]
    Storage(String),
}

/// Result of an atomic check-and-debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The balance covered the amount and was decremented.
    Applied { remaining: u64 },
    /// The balance was left untouched.
    Insufficient { balance: u64 },
}

impl DebitOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Atomic prepaid-balance operations, amounts in smallest currency unit.
pub trait LedgerAdapter: Send + Sync {
    /// Current balance of the account.
    fn balance_of(&self, account: AccountId) -> Result<u64, LedgerError>;

    /// Atomically check the balance and debit `amount` from it.
    fn debit(&self, account: AccountId, amount: u64) -> Result<DebitOutcome, LedgerError>;

    /// Credit `amount` to the account (host-side top-ups, admin adjustments).
    fn credit(&self, account: AccountId, amount: u64) -> Result<u64, LedgerError>;
}

impl<L> LedgerAdapter for Arc<L>
where
    L: LedgerAdapter + ?Sized,
{
    fn balance_of(&self, account: AccountId) -> Result<u64, LedgerError> {
        (**self).balance_of(account)
    }

    fn debit(&self, account: AccountId, amount: u64) -> Result<DebitOutcome, LedgerError> {
        (**self).debit(account, amount)
    }

    fn credit(&self, account: AccountId, amount: u64) -> Result<u64, LedgerError> {
        (**self).credit(account, amount)
    }
}

/// In-memory ledger for tests/dev. One mutex guards every balance, which
/// makes the check-and-debit trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<AccountId, u64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with an opening balance.
    pub fn open_account(&self, account: AccountId, balance: u64) {
        self.balances.lock().unwrap().insert(account, balance);
    }
}

impl LedgerAdapter for InMemoryLedger {
    fn balance_of(&self, account: AccountId) -> Result<u64, LedgerError> {
        self.balances
            .lock()
            .unwrap()
            .get(&account)
            .copied()
            .ok_or(LedgerError::UnknownAccount(account))
    }

    fn debit(&self, account: AccountId, amount: u64) -> Result<DebitOutcome, LedgerError> {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances
            .get_mut(&account)
            .ok_or(LedgerError::UnknownAccount(account))?;
        if *balance < amount {
            return Ok(DebitOutcome::Insufficient { balance: *balance });
        }
        *balance -= amount;
        info!(%account, amount, remaining = *balance, "debited account balance");
        Ok(DebitOutcome::Applied { remaining: *balance })
    }

    fn credit(&self, account: AccountId, amount: u64) -> Result<u64, LedgerError> {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(account).or_insert(0);
        *balance += amount;
        Ok(*balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn debit_decrements_when_covered() {
        let ledger = InMemoryLedger::new();
        let account = AccountId::new();
        ledger.open_account(account, 1500);

        let outcome = ledger.debit(account, 1000).unwrap();
        assert_eq!(outcome, DebitOutcome::Applied { remaining: 500 });
        assert_eq!(ledger.balance_of(account).unwrap(), 500);
    }

    #[test]
    fn insufficient_balance_is_left_untouched() {
        let ledger = InMemoryLedger::new();
        let account = AccountId::new();
        ledger.open_account(account, 900);

        let outcome = ledger.debit(account, 1000).unwrap();
        assert_eq!(outcome, DebitOutcome::Insufficient { balance: 900 });
        assert_eq!(ledger.balance_of(account).unwrap(), 900);
    }

    #[test]
    fn unknown_account_is_an_error() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(
            ledger.debit(AccountId::new(), 1),
            Err(LedgerError::UnknownAccount(_))
        ));
    }

    #[test]
    fn concurrent_debits_never_overdraw() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account = AccountId::new();
        // Enough for exactly three debits of 10.
        ledger.open_account(account, 30);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || ledger.debit(account, 10).unwrap())
            })
            .collect();

        let applied = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(DebitOutcome::is_applied)
            .count();

        assert_eq!(applied, 3);
        assert_eq!(ledger.balance_of(account).unwrap(), 0);
    }
}
