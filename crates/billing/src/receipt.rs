//! Receipt data assembly for processed orders.
//!
//! Produces the line items and totals a host renders into whatever format it
//! wants (HTML, PDF). Rendering itself is outside the engine.

use serde::{Deserialize, Serialize};

use crate::order::Order;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub domain_name: String,
    /// Formatted charge date, e.g. "03 March 2026".
    pub transaction_date: String,
    /// "Register", "Renew", "Restore" or "Transfer".
    pub transaction_type: String,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptData {
    pub period: String,
    pub lines: Vec<ReceiptLine>,
    pub total_price: u64,
}

impl ReceiptData {
    /// Build receipt data from charged orders. Orders without a charge
    /// timestamp are skipped. Returns `None` when nothing is billable.
    pub fn build(orders: &[Order], period: impl Into<String>) -> Option<Self> {
        let mut lines = Vec::new();
        let mut total_price = 0u64;
        for order in orders {
            let Some(finished_at) = order.finished_at else {
                continue;
            };
            for item in &order.items {
                lines.push(ReceiptLine {
                    domain_name: item.domain_name.clone(),
                    transaction_date: finished_at.format("%d %B %Y").to_string(),
                    transaction_type: item.item_type.display_name().to_string(),
                    price: item.price,
                });
                total_price += item.price;
            }
        }
        if lines.is_empty() {
            return None;
        }
        Some(Self {
            period: period.into(),
            lines,
            total_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{ItemType, Order};
    use chrono::Utc;
    use namegrid_core::AccountId;

    #[test]
    fn builds_lines_and_total_from_charged_orders() {
        let mut order = Order::single(AccountId::new(), ItemType::DomainRegister, 1000, "a.com", None);
        order.finished_at = Some(Utc::now());
        let mut other = Order::single(AccountId::new(), ItemType::DomainRenew, 1200, "b.com", None);
        other.finished_at = Some(Utc::now());

        let receipt = ReceiptData::build(&[order, other], "March 2026").unwrap();
        assert_eq!(receipt.lines.len(), 2);
        assert_eq!(receipt.total_price, 2200);
        assert_eq!(receipt.lines[0].transaction_type, "Register");
        assert_eq!(receipt.period, "March 2026");
    }

    #[test]
    fn uncharged_orders_are_skipped() {
        let order = Order::single(AccountId::new(), ItemType::DomainRegister, 1000, "a.com", None);
        assert!(ReceiptData::build(&[order], "2026").is_none());
    }
}
