//! Single order-item execution.
//!
//! One item execution is: claim the domain lease, re-read the item, run the
//! registry operation for its type, then apply the resulting `ItemOutcome`.
//! A charge request is settled against the ledger before the status write;
//! if the debit fails the item is failed instead and nothing is charged.
//! Registry and ledger failures never escape as errors, they become item
//! outcomes, so one bad item cannot abort the rest of an execution pass.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};

use namegrid_accounts::{AccountDirectory, DebitOutcome, LedgerAdapter};
use namegrid_billing::{ItemOutcome, ItemType, Order, OrderItem};
use namegrid_core::OrderItemId;
use namegrid_registry::{
    ContactRepository, DomainRecord, DomainRepository, RegistryClient, RenewOptions, SyncOptions,
};

use crate::config::EngineConfig;
use crate::lease::DomainLeaseSet;
use crate::store::{OrderStore, OrderStoreError};
use crate::transfer;

pub(crate) const ERR_NOT_PREPARED: &str = "domain was not prepared or not exist";
pub(crate) const ERR_WRONG_OWNER: &str = "domain was owned by another user";
pub(crate) const ERR_NO_FUNDS: &str = "not enough account balance";

/// Executes individual order items against the registry and the ledger.
pub struct ItemExecutor {
    pub(crate) registry: Arc<dyn RegistryClient>,
    pub(crate) domains: Arc<dyn DomainRepository>,
    pub(crate) contacts: Arc<dyn ContactRepository>,
    pub(crate) ledger: Arc<dyn LedgerAdapter>,
    pub(crate) accounts: Arc<dyn AccountDirectory>,
    pub(crate) store: Arc<dyn OrderStore>,
    pub(crate) leases: Arc<DomainLeaseSet>,
    pub(crate) config: EngineConfig,
}

impl ItemExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        domains: Arc<dyn DomainRepository>,
        contacts: Arc<dyn ContactRepository>,
        ledger: Arc<dyn LedgerAdapter>,
        accounts: Arc<dyn AccountDirectory>,
        store: Arc<dyn OrderStore>,
        leases: Arc<DomainLeaseSet>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            domains,
            contacts,
            ledger,
            accounts,
            store,
            leases,
            config,
        }
    }

    /// Run one item to an outcome. Returns whether an attempt actually
    /// happened: a held lease or an item that no longer needs execution
    /// yields `Ok(false)` without touching anything.
    ///
    /// `already_processed` back-fills a historically fulfilled item: the
    /// item is charged and marked processed without any registry calls.
    pub fn execute_item(
        &self,
        order: &Order,
        item_id: OrderItemId,
        already_processed: bool,
    ) -> Result<bool, OrderStoreError> {
        let Some(snapshot) = order.item(item_id) else {
            return Err(OrderStoreError::ItemNotFound);
        };
        let Some(_lease) = self.leases.acquire(&snapshot.domain_name) else {
            warn!(
                order = %order.id,
                domain = %snapshot.domain_name,
                "domain busy in another execution, skipping item"
            );
            return Ok(false);
        };

        // Re-read under the lease: a concurrent pass may have finished the
        // item between the caller's snapshot and our lease acquisition.
        let current = self.store.get(order.id)?;
        let item = current.item(item_id).ok_or(OrderStoreError::ItemNotFound)?;
        if !item.status.needs_execution() {
            return Ok(false);
        }

        let outcome = if already_processed {
            ItemOutcome::processed_already("processed manually")
        } else {
            self.store
                .update_item(order.id, item_id, &ItemOutcome::executing())?;
            self.run_operation(&current, item)
                .unwrap_or_else(|e| ItemOutcome::failed_with_error(format!("{e:#}")))
        };

        self.apply_outcome(&current, item_id, outcome)?;
        Ok(true)
    }

    fn run_operation(&self, order: &Order, item: &OrderItem) -> anyhow::Result<ItemOutcome> {
        match item.item_type {
            ItemType::DomainRegister => self.run_register_or_renew(order, item, false),
            ItemType::DomainRenew => self.run_register_or_renew(order, item, true),
            ItemType::DomainRestore => self.run_restore(order, item),
            ItemType::DomainTransfer => transfer::execute_transfer(self, order, item),
        }
    }

    /// Registrations and renewals share the backend's composite
    /// check/create/update/renew call.
    fn run_register_or_renew(
        &self,
        order: &Order,
        item: &OrderItem,
        is_renew: bool,
    ) -> anyhow::Result<ItemOutcome> {
        let Some(record) = self.load_domain(item)? else {
            return Ok(ItemOutcome::blocked(ERR_NOT_PREPARED));
        };
        if record.owner != order.owner {
            return Ok(ItemOutcome::blocked(ERR_WRONG_OWNER));
        }
        if !self.covers_price(order, item)? {
            return Ok(ItemOutcome::failed_with_error(ERR_NO_FUNDS));
        }
        let options = RenewOptions {
            sync_contacts: false,
            sync_nameservers: true,
            renew_years: self.config.renew_years,
        };
        match self.registry.check_create_update_renew(&record, &options) {
            Ok(steps) => {
                if is_renew {
                    self.post_renew_sync(&record.name);
                }
                Ok(ItemOutcome::processed_and_charged(step_messages(&steps)))
            }
            Err(e) => {
                info!(
                    order = %order.id,
                    domain = %item.domain_name,
                    error = %e,
                    "registry refused lifecycle operation"
                );
                Ok(ItemOutcome::failed_with_outputs(e.output_chain()))
            }
        }
    }

    /// A renewal moves the expiry date at the backend; pull the new state
    /// into the local cache. Contacts did not change, only the dates. Best
    /// effort, the charge already happened.
    fn post_renew_sync(&self, domain_name: &str) {
        let options = SyncOptions::default();
        if let Err(e) = self.registry.synchronize_from_backend(domain_name, &options) {
            warn!(domain = domain_name, error = %e, "post-renew synchronization failed");
        }
    }

    fn run_restore(&self, order: &Order, item: &OrderItem) -> anyhow::Result<ItemOutcome> {
        let Some(record) = self.load_domain(item)? else {
            return Ok(ItemOutcome::blocked(ERR_NOT_PREPARED));
        };
        if record.owner != order.owner {
            return Ok(ItemOutcome::blocked(ERR_WRONG_OWNER));
        }
        if !self.covers_price(order, item)? {
            return Ok(ItemOutcome::failed_with_error(ERR_NO_FUNDS));
        }
        let reason = match self.accounts.find(order.owner) {
            Some(account) => format!("order placed by {}", account.email),
            None => format!("order placed by account {}", order.owner),
        };
        match self.registry.restore(&record, &reason) {
            Ok(steps) => Ok(ItemOutcome::processed_and_charged(step_messages(&steps))),
            Err(e) => Ok(ItemOutcome::failed_with_outputs(e.output_chain())),
        }
    }

    fn load_domain(&self, item: &OrderItem) -> anyhow::Result<Option<DomainRecord>> {
        self.domains
            .find_by_name(&item.domain_name)
            .with_context(|| format!("loading domain {}", item.domain_name))
    }

    /// Balance precondition, checked before any registry call so the backend
    /// never executes an operation the owner cannot pay for. The debit in
    /// `apply_outcome` re-checks atomically at charge time.
    fn covers_price(&self, order: &Order, item: &OrderItem) -> anyhow::Result<bool> {
        let balance = self
            .ledger
            .balance_of(order.owner)
            .with_context(|| format!("reading balance of {}", order.owner))?;
        Ok(balance >= item.price)
    }

    /// Settle the charge (if requested) and write the final item state.
    /// The ledger debit happens first: a declined or failed debit rewrites
    /// the outcome to a failure and the order is never marked charged.
    pub(crate) fn apply_outcome(
        &self,
        order: &Order,
        item_id: OrderItemId,
        mut outcome: ItemOutcome,
    ) -> Result<(), OrderStoreError> {
        if outcome.charge {
            let price = order.item(item_id).map(|i| i.price).unwrap_or_default();
            match self.ledger.debit(order.owner, price) {
                Ok(DebitOutcome::Applied { remaining }) => {
                    info!(
                        order = %order.id,
                        owner = %order.owner,
                        amount = price,
                        remaining,
                        "charged order item"
                    );
                    self.store.mark_finished(order.id, Utc::now())?;
                }
                Ok(DebitOutcome::Insufficient { balance }) => {
                    warn!(
                        order = %order.id,
                        owner = %order.owner,
                        amount = price,
                        balance,
                        "balance insufficient at charge time"
                    );
                    outcome = ItemOutcome::failed_with_error(ERR_NO_FUNDS);
                }
                Err(e) => {
                    error!(order = %order.id, owner = %order.owner, error = %e, "ledger debit failed");
                    outcome = ItemOutcome::failed_with_error(e.to_string());
                }
            }
        }
        self.store.update_item(order.id, item_id, &outcome)?;
        Ok(())
    }
}

pub(crate) fn step_messages(steps: &[namegrid_registry::StepLog]) -> Vec<String> {
    steps.iter().map(ToString::to_string).collect()
}
