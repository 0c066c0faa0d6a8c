//! Order-level orchestration.
//!
//! An execution pass walks the order's items, hands each eligible one to the
//! item executor, and folds the observed end states into the order status
//! via the pass rule. The refresh path recomputes the status from stored
//! item statuses alone, for when an external event (e.g. a transfer ack)
//! settled an item outside an execution pass.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use namegrid_billing::{
    refresh_status, ExecutionTally, ItemDetails, ItemOutcome, ItemType, NewOrderItem, Order,
    OrderItemStatus, OrderStatus, ReceiptData,
};
use namegrid_core::{AccountId, EngineError, EngineResult, OrderId};

use crate::executor::ItemExecutor;
use crate::store::OrderStoreError;

/// Fulfillment engine entry point.
pub struct OrderCoordinator {
    pub(crate) executor: ItemExecutor,
}

impl From<OrderStoreError> for EngineError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::EmptyOrder => EngineError::validation("order has no items"),
            OrderStoreError::DuplicateRegisterItem(name) => {
                EngineError::conflict(format!("domain {name} already has an active register order"))
            }
            OrderStoreError::OrderNotFound | OrderStoreError::ItemNotFound => {
                EngineError::not_found()
            }
            OrderStoreError::Storage(msg) => EngineError::storage(msg),
        }
    }
}

impl OrderCoordinator {
    pub fn new(executor: ItemExecutor) -> Self {
        Self { executor }
    }

    /// Create an order with one item and a derived description.
    pub fn create_single_item_order(
        &self,
        owner: AccountId,
        item_type: ItemType,
        price: u64,
        domain_name: impl Into<String>,
        details: Option<ItemDetails>,
    ) -> EngineResult<Order> {
        let order = Order::single(owner, item_type, price, domain_name, details);
        Ok(self.executor.store.create(order)?)
    }

    /// Create an order covering several domain operations billed together.
    pub fn create_multi_item_order(
        &self,
        owner: AccountId,
        items: Vec<NewOrderItem>,
    ) -> EngineResult<Order> {
        let order = Order::multi(owner, items);
        Ok(self.executor.store.create(order)?)
    }

    /// Run one execution pass over the order and return its new status.
    ///
    /// Items already processed, pending, or blocked are skipped; everything
    /// else is attempted, and the status each attempted item ended with is
    /// what the pass rule folds. Safe to call again after a crash or
    /// timeout: finished work is never redone or recharged.
    ///
    /// `already_processed` marks every eligible item as fulfilled without
    /// registry calls, charging normally. Used to back-fill orders whose
    /// operations were carried out by hand.
    pub fn execute_order(
        &self,
        order_id: OrderId,
        already_processed: bool,
    ) -> EngineResult<OrderStatus> {
        let order = self.executor.store.get(order_id)?;
        if order.status == OrderStatus::Cancelled {
            return Err(EngineError::conflict("order is cancelled"));
        }
        self.executor
            .store
            .set_order_status(order_id, OrderStatus::Processing)?;

        let mut tally = ExecutionTally::new();
        for item in &order.items {
            if !item.status.needs_execution() {
                continue;
            }
            if !self
                .executor
                .execute_item(&order, item.id, already_processed)?
            {
                // Lease busy or a concurrent pass settled it; not ours.
                continue;
            }
            tally.attempted();
            let current = self.executor.store.get(order_id)?;
            if let Some(ended) = current.item(item.id) {
                tally.observe(ended.status);
            }
        }

        let status = tally.resolve();
        self.executor.store.set_order_status(order_id, status)?;
        info!(
            order = %order_id,
            executed = tally.executed,
            processed = tally.processed,
            failed = tally.failed,
            status = ?status,
            "execution pass finished"
        );
        Ok(status)
    }

    /// Recompute the order status from stored item statuses, without any
    /// registry or ledger calls.
    pub fn refresh_order(&self, order_id: OrderId) -> EngineResult<OrderStatus> {
        let order = self.executor.store.get(order_id)?;
        if order.status == OrderStatus::Cancelled {
            return Ok(OrderStatus::Cancelled);
        }
        let status = refresh_status(&order.item_statuses());
        self.executor.store.set_order_status(order_id, status)?;
        Ok(status)
    }

    /// Cancel an order that has not been charged yet.
    pub fn cancel_order(&self, order_id: OrderId) -> EngineResult<()> {
        let order = self.executor.store.get(order_id)?;
        if order.is_charged() {
            return Err(EngineError::conflict("order was already charged"));
        }
        self.executor
            .store
            .set_order_status(order_id, OrderStatus::Cancelled)?;
        Ok(())
    }

    /// Remove an uncharged order and its items entirely.
    pub fn delete_order(&self, order_id: OrderId) -> EngineResult<()> {
        let order = self.executor.store.get(order_id)?;
        if order.is_charged() {
            return Err(EngineError::conflict("order was already charged"));
        }
        self.executor.store.delete(order_id)?;
        Ok(())
    }

    /// An owner's order history, newest first.
    pub fn list_orders(
        &self,
        owner: AccountId,
        include_cancelled: bool,
        include_statuses: Option<&[OrderStatus]>,
    ) -> EngineResult<Vec<Order>> {
        Ok(self
            .executor
            .store
            .list_orders(owner, include_cancelled, include_statuses)?)
    }

    /// Fetch an order, verifying the caller owns it.
    pub fn find_order_for_owner(&self, order_id: OrderId, owner: AccountId) -> EngineResult<Order> {
        let order = self.executor.store.get(order_id)?;
        if order.owner != owner {
            return Err(EngineError::Unauthorized);
        }
        Ok(order)
    }

    /// Settle a pending external transfer after the losing registrar's
    /// answer arrived. A confirmation charges the item and marks it
    /// processed; a rejection fails it. Returns the order's refreshed
    /// status, or `None` when no pending transfer exists for the domain or
    /// another execution currently holds it (e.g. a duplicate notification).
    pub fn complete_pending_transfer(
        &self,
        domain_name: &str,
        confirmed: bool,
        outputs: Vec<String>,
    ) -> EngineResult<Option<OrderStatus>> {
        let Some((order_id, item_id)) = self.executor.store.find_pending_transfer(domain_name)?
        else {
            return Ok(None);
        };
        let Some(_lease) = self.executor.leases.acquire(domain_name) else {
            return Ok(None);
        };
        // Re-read under the lease: a concurrent notification may have
        // settled (and charged) the item already.
        let order = self.executor.store.get(order_id)?;
        if !order
            .item(item_id)
            .is_some_and(|i| i.status == OrderItemStatus::Pending)
        {
            return Ok(None);
        }
        let outcome = if confirmed {
            ItemOutcome::processed_and_charged(outputs)
        } else {
            ItemOutcome::failed_with_outputs(outputs)
        };
        self.executor.apply_outcome(&order, item_id, outcome)?;
        let status = self.refresh_order(order_id)?;
        info!(
            order = %order_id,
            domain = domain_name,
            confirmed,
            status = ?status,
            "pending transfer settled"
        );
        Ok(Some(status))
    }

    /// Re-run failed/incomplete orders older than the stale window.
    /// Returns the per-order outcome of the sweep.
    pub fn retry_stale_orders(
        &self,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<(OrderId, OrderStatus)>> {
        let window = chrono::Duration::from_std(self.executor.config.stale_order_window)
            .map_err(|e| EngineError::validation(format!("stale window out of range: {e}")))?;
        let stale = self.executor.store.find_stale_orders(now - window)?;
        let mut results = Vec::with_capacity(stale.len());
        for order in stale {
            let status = self.execute_order(order.id, false)?;
            results.push((order.id, status));
        }
        Ok(results)
    }

    /// Receipt data over charged orders in a period. `owner` of `None`
    /// spans all accounts; `month` of `None` covers the whole year.
    pub fn build_receipts(
        &self,
        owner: Option<AccountId>,
        year: i32,
        month: Option<u32>,
    ) -> EngineResult<Option<ReceiptData>> {
        let orders = self
            .executor
            .store
            .list_processed_orders_by_date(owner, year, month)?;
        let period = match month.and_then(|m| NaiveDate::from_ymd_opt(year, m, 1)) {
            Some(first) => first.format("%B %Y").to_string(),
            None => year.to_string(),
        };
        Ok(ReceiptData::build(&orders, period))
    }
}
