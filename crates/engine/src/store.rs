//! Order persistence.
//!
//! All item mutations funnel through `update_item` with an `ItemOutcome`, so
//! details stay merge-only and status writes are atomic per item. The charge
//! flag on an outcome is the executor's concern; the store ignores it.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use namegrid_billing::{ItemOutcome, ItemType, Order, OrderItem, OrderItemStatus, OrderStatus};
use namegrid_core::{AccountId, OrderId, OrderItemId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderStoreError {
    #[error("order has no items")]
    EmptyOrder,
    #[error("domain {0} already has an active register order")]
    DuplicateRegisterItem(String),
    #[error("order not found")]
    OrderNotFound,
    #[error("order item not found")]
    ItemNotFound,
    #[error("order storage failure: {0}")]
    Storage(String),
}

/// Storage surface for orders and their items.
pub trait OrderStore: Send + Sync {
    /// Persist a new order. Rejects empty orders and register items for a
    /// domain that already has an unfinished register order anywhere in the
    /// system.
    fn create(&self, order: Order) -> Result<Order, OrderStoreError>;

    fn get(&self, id: OrderId) -> Result<Order, OrderStoreError>;

    fn delete(&self, id: OrderId) -> Result<(), OrderStoreError>;

    /// Apply one outcome to one item and return the updated item.
    fn update_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        outcome: &ItemOutcome,
    ) -> Result<OrderItem, OrderStoreError>;

    fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<(), OrderStoreError>;

    /// Stamp the charge moment. Recorded once; later calls keep the first.
    fn mark_finished(&self, id: OrderId, at: DateTime<Utc>) -> Result<(), OrderStoreError>;

    /// Orders of one owner, newest first, optionally narrowed to a status
    /// set.
    fn list_orders(
        &self,
        owner: AccountId,
        include_cancelled: bool,
        include_statuses: Option<&[OrderStatus]>,
    ) -> Result<Vec<Order>, OrderStoreError>;

    /// Owner's orders started in a given year (and month, when supplied).
    fn list_orders_by_date(
        &self,
        owner: AccountId,
        year: i32,
        month: Option<u32>,
        include_cancelled: bool,
    ) -> Result<Vec<Order>, OrderStoreError>;

    /// Charged orders in a period, for receipt building. `owner` of `None`
    /// spans all accounts.
    fn list_processed_orders_by_date(
        &self,
        owner: Option<AccountId>,
        year: i32,
        month: Option<u32>,
    ) -> Result<Vec<Order>, OrderStoreError>;

    /// Non-terminal items of one type for one domain, with their orders.
    /// Feeds duplicate-attempt guards.
    fn find_unprocessed_items(
        &self,
        item_type: ItemType,
        domain_name: &str,
    ) -> Result<Vec<(OrderId, OrderItem)>, OrderStoreError>;

    /// The order/item pair of a pending transfer for this domain, if any.
    fn find_pending_transfer(
        &self,
        domain_name: &str,
    ) -> Result<Option<(OrderId, OrderItemId)>, OrderStoreError>;

    /// Failed or incomplete orders with retryable items, started at or
    /// before `cutoff`. Feeds the retry sweep.
    fn find_stale_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, OrderStoreError>;

    /// Most recent charged restore order for a domain, if any.
    fn find_latest_processed_restore_order(
        &self,
        domain_name: &str,
    ) -> Result<Option<Order>, OrderStoreError>;
}

impl<S: OrderStore + ?Sized> OrderStore for std::sync::Arc<S> {
    fn create(&self, order: Order) -> Result<Order, OrderStoreError> {
        (**self).create(order)
    }

    fn get(&self, id: OrderId) -> Result<Order, OrderStoreError> {
        (**self).get(id)
    }

    fn delete(&self, id: OrderId) -> Result<(), OrderStoreError> {
        (**self).delete(id)
    }

    fn update_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        outcome: &ItemOutcome,
    ) -> Result<OrderItem, OrderStoreError> {
        (**self).update_item(order_id, item_id, outcome)
    }

    fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<(), OrderStoreError> {
        (**self).set_order_status(id, status)
    }

    fn mark_finished(&self, id: OrderId, at: DateTime<Utc>) -> Result<(), OrderStoreError> {
        (**self).mark_finished(id, at)
    }

    fn list_orders(
        &self,
        owner: AccountId,
        include_cancelled: bool,
        include_statuses: Option<&[OrderStatus]>,
    ) -> Result<Vec<Order>, OrderStoreError> {
        (**self).list_orders(owner, include_cancelled, include_statuses)
    }

    fn find_unprocessed_items(
        &self,
        item_type: ItemType,
        domain_name: &str,
    ) -> Result<Vec<(OrderId, OrderItem)>, OrderStoreError> {
        (**self).find_unprocessed_items(item_type, domain_name)
    }

    fn list_orders_by_date(
        &self,
        owner: AccountId,
        year: i32,
        month: Option<u32>,
        include_cancelled: bool,
    ) -> Result<Vec<Order>, OrderStoreError> {
        (**self).list_orders_by_date(owner, year, month, include_cancelled)
    }

    fn list_processed_orders_by_date(
        &self,
        owner: Option<AccountId>,
        year: i32,
        month: Option<u32>,
    ) -> Result<Vec<Order>, OrderStoreError> {
        (**self).list_processed_orders_by_date(owner, year, month)
    }

    fn find_pending_transfer(
        &self,
        domain_name: &str,
    ) -> Result<Option<(OrderId, OrderItemId)>, OrderStoreError> {
        (**self).find_pending_transfer(domain_name)
    }

    fn find_stale_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, OrderStoreError> {
        (**self).find_stale_orders(cutoff)
    }

    fn find_latest_processed_restore_order(
        &self,
        domain_name: &str,
    ) -> Result<Option<Order>, OrderStoreError> {
        (**self).find_latest_processed_restore_order(domain_name)
    }
}

/// In-memory store backed by a `RwLock`ed map, for tests and single-node use.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard_duplicate_register(
        orders: &HashMap<OrderId, Order>,
        candidate: &Order,
    ) -> Result<(), OrderStoreError> {
        for item in &candidate.items {
            if item.item_type != ItemType::DomainRegister {
                continue;
            }
            let taken = orders.values().any(|existing| {
                !matches!(
                    existing.status,
                    OrderStatus::Processed | OrderStatus::Cancelled | OrderStatus::Failed
                ) && existing.items.iter().any(|other| {
                    other.item_type == ItemType::DomainRegister
                        && other.domain_name == item.domain_name
                        && !other.status.is_terminal()
                })
            });
            if taken {
                return Err(OrderStoreError::DuplicateRegisterItem(
                    item.domain_name.clone(),
                ));
            }
        }
        Ok(())
    }
}

impl OrderStore for InMemoryOrderStore {
    fn create(&self, order: Order) -> Result<Order, OrderStoreError> {
        if order.items.is_empty() {
            return Err(OrderStoreError::EmptyOrder);
        }
        let mut orders = self.orders.write().unwrap();
        Self::guard_duplicate_register(&orders, &order)?;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn get(&self, id: OrderId) -> Result<Order, OrderStoreError> {
        self.orders
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(OrderStoreError::OrderNotFound)
    }

    fn delete(&self, id: OrderId) -> Result<(), OrderStoreError> {
        self.orders
            .write()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(OrderStoreError::OrderNotFound)
    }

    fn update_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        outcome: &ItemOutcome,
    ) -> Result<OrderItem, OrderStoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders
            .get_mut(&order_id)
            .ok_or(OrderStoreError::OrderNotFound)?;
        let item = order
            .item_mut(item_id)
            .ok_or(OrderStoreError::ItemNotFound)?;
        if let Some(status) = outcome.status {
            item.status = status;
        }
        if let Some(details) = &outcome.details {
            item.details.merge(details);
        }
        if let Some(outputs) = &outcome.outputs {
            item.details.set_outputs(outputs.clone());
        }
        Ok(item.clone())
    }

    fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<(), OrderStoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders.get_mut(&id).ok_or(OrderStoreError::OrderNotFound)?;
        order.status = status;
        Ok(())
    }

    fn mark_finished(&self, id: OrderId, at: DateTime<Utc>) -> Result<(), OrderStoreError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders.get_mut(&id).ok_or(OrderStoreError::OrderNotFound)?;
        if order.finished_at.is_none() {
            order.finished_at = Some(at);
        }
        Ok(())
    }

    fn list_orders(
        &self,
        owner: AccountId,
        include_cancelled: bool,
        include_statuses: Option<&[OrderStatus]>,
    ) -> Result<Vec<Order>, OrderStoreError> {
        let orders = self.orders.read().unwrap();
        let mut found: Vec<Order> = orders
            .values()
            .filter(|o| o.owner == owner)
            .filter(|o| include_cancelled || o.status != OrderStatus::Cancelled)
            .filter(|o| include_statuses.is_none_or(|wanted| wanted.contains(&o.status)))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(found)
    }

    fn find_unprocessed_items(
        &self,
        item_type: ItemType,
        domain_name: &str,
    ) -> Result<Vec<(OrderId, OrderItem)>, OrderStoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .flat_map(|o| {
                o.items
                    .iter()
                    .filter(|i| {
                        i.item_type == item_type
                            && i.domain_name == domain_name
                            && i.status != OrderItemStatus::Processed
                    })
                    .map(|i| (o.id, i.clone()))
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    fn list_orders_by_date(
        &self,
        owner: AccountId,
        year: i32,
        month: Option<u32>,
        include_cancelled: bool,
    ) -> Result<Vec<Order>, OrderStoreError> {
        let mut found = self.list_orders(owner, include_cancelled, None)?;
        found.retain(|o| {
            o.started_at.year() == year && month.is_none_or(|m| o.started_at.month() == m)
        });
        Ok(found)
    }

    fn list_processed_orders_by_date(
        &self,
        owner: Option<AccountId>,
        year: i32,
        month: Option<u32>,
    ) -> Result<Vec<Order>, OrderStoreError> {
        let orders = self.orders.read().unwrap();
        let mut found: Vec<Order> = orders
            .values()
            .filter(|o| o.status == OrderStatus::Processed && o.is_charged())
            .filter(|o| owner.is_none_or(|owner| o.owner == owner))
            .filter(|o| {
                o.started_at.year() == year && month.is_none_or(|m| o.started_at.month() == m)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(found)
    }

    fn find_pending_transfer(
        &self,
        domain_name: &str,
    ) -> Result<Option<(OrderId, OrderItemId)>, OrderStoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders.values().find_map(|o| {
            o.items
                .iter()
                .find(|i| {
                    i.item_type == ItemType::DomainTransfer
                        && i.domain_name == domain_name
                        && i.status == OrderItemStatus::Pending
                })
                .map(|i| (o.id, i.id))
        }))
    }

    fn find_stale_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, OrderStoreError> {
        let orders = self.orders.read().unwrap();
        let mut found: Vec<Order> = orders
            .values()
            .filter(|o| matches!(o.status, OrderStatus::Failed | OrderStatus::Incomplete))
            .filter(|o| o.started_at <= cutoff)
            .filter(|o| {
                o.items.iter().any(|i| {
                    matches!(
                        i.status,
                        OrderItemStatus::Executing | OrderItemStatus::Failed
                    )
                })
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(found)
    }

    fn find_latest_processed_restore_order(
        &self,
        domain_name: &str,
    ) -> Result<Option<Order>, OrderStoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.status == OrderStatus::Processed && o.is_charged())
            .filter(|o| {
                o.items.iter().any(|i| {
                    i.item_type == ItemType::DomainRestore && i.domain_name == domain_name
                })
            })
            .max_by_key(|o| o.started_at)
            .cloned())
    }
}
