use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use namegrid_core::{AccountId, OrderId, OrderItemId};

use crate::details::ItemDetails;

/// Domain lifecycle operation sold as one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    DomainRegister,
    DomainRenew,
    DomainRestore,
    DomainTransfer,
}

impl ItemType {
    /// Short verb used in order descriptions ("register", "renew", ...).
    pub fn verb(&self) -> &'static str {
        match self {
            ItemType::DomainRegister => "register",
            ItemType::DomainRenew => "renew",
            ItemType::DomainRestore => "restore",
            ItemType::DomainTransfer => "transfer",
        }
    }

    /// Human label used on receipts.
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemType::DomainRegister => "Register",
            ItemType::DomainRenew => "Renew",
            ItemType::DomainRestore => "Restore",
            ItemType::DomainTransfer => "Transfer",
        }
    }
}

impl core::fmt::Display for ItemType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "domain_{}", self.verb())
    }
}

/// Order item status lifecycle.
///
/// `Processed`, `Failed` and `Blocked` are terminal. `Pending` awaits an
/// asynchronous registry completion (external transfer-in) and is settled
/// later by a refresh pass or an external notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderItemStatus {
    Started,
    Executing,
    Pending,
    Blocked,
    Processed,
    Failed,
}

impl OrderItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Failed | Self::Blocked)
    }

    /// Whether an execution pass should attempt this item. Items already
    /// processed, awaiting async completion, or permanently rejected are
    /// never re-executed; everything else (including `Executing` left behind
    /// by a crashed run) is fair game.
    pub fn needs_execution(&self) -> bool {
        !matches!(self, Self::Processed | Self::Pending | Self::Blocked)
    }
}

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Started,
    Processing,
    Processed,
    Incomplete,
    Failed,
    Cancelled,
}

/// One domain-operation line within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub item_type: ItemType,
    pub status: OrderItemStatus,
    /// Price in smallest currency unit, fixed at creation.
    pub price: u64,
    pub domain_name: String,
    pub details: ItemDetails,
}

impl OrderItem {
    pub fn new(
        item_type: ItemType,
        price: u64,
        domain_name: impl Into<String>,
        details: Option<ItemDetails>,
    ) -> Self {
        Self {
            id: OrderItemId::new(),
            item_type,
            status: OrderItemStatus::Started,
            price,
            domain_name: domain_name.into(),
            details: details.unwrap_or_default(),
        }
    }
}

/// Attributes for one line of a multi-item order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub item_type: ItemType,
    pub price: u64,
    pub domain_name: String,
    pub details: Option<ItemDetails>,
}

impl NewOrderItem {
    pub fn new(item_type: ItemType, price: u64, domain_name: impl Into<String>) -> Self {
        Self {
            item_type,
            price,
            domain_name: domain_name.into(),
            details: None,
        }
    }
}

/// A customer's request for one or more domain operations, billed as a unit.
///
/// The status is always the deterministic aggregate of the item statuses
/// (see `aggregation`); only the terminal `Cancelled` transition is set
/// independently. `finished_at` is stamped exactly when a ledger charge
/// happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: AccountId,
    pub status: OrderStatus,
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Create an order with a single item and a derived description.
    pub fn single(
        owner: AccountId,
        item_type: ItemType,
        price: u64,
        domain_name: impl Into<String>,
        details: Option<ItemDetails>,
    ) -> Self {
        let domain_name = domain_name.into();
        let automatic = details
            .as_ref()
            .map(|d| d.created_automatically())
            .unwrap_or(false);
        let description = if automatic {
            format!("{} {} (automatically)", domain_name, item_type.verb())
        } else {
            format!("{} {}", domain_name, item_type.verb())
        };
        Self {
            id: OrderId::new(),
            owner,
            status: OrderStatus::Started,
            description,
            started_at: Utc::now(),
            finished_at: None,
            items: vec![OrderItem::new(item_type, price, domain_name, details)],
        }
    }

    /// Create an order with multiple items and a summarizing description,
    /// e.g. "register 2 domains, renew 1 domain".
    pub fn multi(owner: AccountId, items: Vec<NewOrderItem>) -> Self {
        let description = describe_items(&items);
        Self {
            id: OrderId::new(),
            owner,
            status: OrderStatus::Started,
            description,
            started_at: Utc::now(),
            finished_at: None,
            items: items
                .into_iter()
                .map(|i| OrderItem::new(i.item_type, i.price, i.domain_name, i.details))
                .collect(),
        }
    }

    pub fn is_charged(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn item(&self, id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn item_mut(&mut self, id: OrderItemId) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn item_statuses(&self) -> Vec<OrderItemStatus> {
        self.items.iter().map(|i| i.status).collect()
    }

    pub fn total_price(&self) -> u64 {
        self.items.iter().map(|i| i.price).sum()
    }
}

fn describe_items(items: &[NewOrderItem]) -> String {
    if items.len() == 1 {
        return format!("domain {}", items[0].item_type.verb());
    }
    // Group by type, preserving first-seen order.
    let mut groups: Vec<(ItemType, usize)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(t, _)| *t == item.item_type) {
            Some((_, count)) => *count += 1,
            None => groups.push((item.item_type, 1)),
        }
    }
    groups
        .iter()
        .map(|(item_type, count)| {
            let label = if *count > 1 { "domains" } else { "domain" };
            format!("{} {} {}", item_type.verb(), count, label)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
