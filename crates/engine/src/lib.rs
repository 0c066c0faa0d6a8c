//! `namegrid-engine` — the order fulfillment engine.
//!
//! Drives each order item through its registry operation, settles confirmed
//! successes against the prepaid ledger exactly once, folds item outcomes
//! into an order status, and stays safe to re-run after crashes or timeouts.

pub mod config;
pub mod coordinator;
pub mod executor;
pub mod lease;
pub mod prepare;
pub mod renewal;
pub mod store;
pub mod transfer;


pub use config::EngineConfig;
pub use coordinator::OrderCoordinator;
pub use executor::ItemExecutor;
pub use lease::{DomainLease, DomainLeaseSet};
pub use prepare::{prepare_lifecycle_item, BulkTransferOutcome, TransferCheck};
pub use renewal::{RenewalAttempt, RenewalBook, RenewalStatus};
pub use store::{InMemoryOrderStore, OrderStore, OrderStoreError};
