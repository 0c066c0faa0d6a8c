//! `namegrid-accounts` — paying accounts and the prepaid balance ledger.

pub mod account;
pub mod ledger;

pub use account::{Account, AccountDirectory, AccountProfile, InMemoryAccountDirectory};
pub use ledger::{DebitOutcome, InMemoryLedger, LedgerAdapter, LedgerError};
