//! The status/charge/details triple applied after each execution step.
//!
//! Every item mutation goes through one `ItemOutcome` applied atomically by
//! the order store, instead of three independent writes. A charge request is
//! only ever paired with the `Processed` transition.

use crate::details::ItemDetails;
use crate::order::OrderItemStatus;

/// One atomic update to an order item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    pub status: Option<OrderItemStatus>,
    pub charge: bool,
    pub details: Option<ItemDetails>,
    pub outputs: Option<Vec<String>>,
}

impl ItemOutcome {
    /// Item picked up for execution.
    pub fn executing() -> Self {
        Self {
            status: Some(OrderItemStatus::Executing),
            ..Self::default()
        }
    }

    /// Confirmed success: mark processed and debit the owner.
    pub fn processed_and_charged(outputs: Vec<String>) -> Self {
        Self {
            status: Some(OrderItemStatus::Processed),
            charge: true,
            outputs: Some(outputs),
            ..Self::default()
        }
    }

    /// Back-fill of a historically fulfilled item: charge without registry calls.
    pub fn processed_already(reason: impl Into<String>) -> Self {
        Self {
            status: Some(OrderItemStatus::Processed),
            charge: true,
            details: Some(ItemDetails::with_reason(reason)),
            ..Self::default()
        }
    }

    /// Backend reported failure; keep the raw output chain for diagnosis.
    pub fn failed_with_outputs(outputs: Vec<String>) -> Self {
        Self {
            status: Some(OrderItemStatus::Failed),
            outputs: Some(outputs),
            ..Self::default()
        }
    }

    pub fn failed_with_error(error: impl Into<String>) -> Self {
        Self {
            status: Some(OrderItemStatus::Failed),
            details: Some(ItemDetails::with_error(error)),
            ..Self::default()
        }
    }

    pub fn failed_with_error_and_outputs(error: impl Into<String>, outputs: Vec<String>) -> Self {
        Self {
            status: Some(OrderItemStatus::Failed),
            details: Some(ItemDetails::with_error(error)),
            outputs: Some(outputs),
            ..Self::default()
        }
    }

    /// Permanent rejection, e.g. wrong owner or invalid transfer code.
    pub fn blocked(error: impl Into<String>) -> Self {
        Self {
            status: Some(OrderItemStatus::Blocked),
            details: Some(ItemDetails::with_error(error)),
            ..Self::default()
        }
    }

    /// Asynchronous completion requested; no charge until confirmed.
    pub fn pending(outputs: Vec<String>) -> Self {
        Self {
            status: Some(OrderItemStatus::Pending),
            outputs: Some(outputs),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_is_only_paired_with_processed() {
        let outcomes = [
            ItemOutcome::executing(),
            ItemOutcome::failed_with_error("x"),
            ItemOutcome::failed_with_outputs(vec![]),
            ItemOutcome::blocked("x"),
            ItemOutcome::pending(vec![]),
        ];
        for outcome in &outcomes {
            assert!(!outcome.charge, "{outcome:?} must not charge");
        }
        assert!(ItemOutcome::processed_and_charged(vec![]).charge);
        assert!(ItemOutcome::processed_already("already processed").charge);
    }

    #[test]
    fn blocked_records_error_detail() {
        let outcome = ItemOutcome::blocked("domain was owned by another user");
        assert_eq!(
            outcome.details.unwrap().error(),
            Some("domain was owned by another user")
        );
        assert_eq!(outcome.status, Some(OrderItemStatus::Blocked));
    }
}
