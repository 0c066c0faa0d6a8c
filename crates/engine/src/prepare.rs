//! Pre-order preparation.
//!
//! Turning a customer's intent into order items: deriving the lifecycle
//! operation from the cached domain state, and vetting inbound transfers
//! against the backend before any order exists.

use tracing::info;

use namegrid_billing::{ItemDetails, ItemType, NewOrderItem, Order};
use namegrid_core::{AccountId, EngineError, EngineResult};
use namegrid_registry::{BackendErrorKind, DomainRecord};

use crate::config::EngineConfig;
use crate::coordinator::OrderCoordinator;
use crate::executor::ERR_NO_FUNDS;

/// Derive the lifecycle operation and price for a domain from its cached
/// state: expired-in-redemption restores, registered renews, otherwise
/// registers. Blocked domains take no orders at all.
pub fn prepare_lifecycle_item(
    record: &DomainRecord,
    config: &EngineConfig,
) -> EngineResult<(ItemType, u64)> {
    if record.is_blocked() {
        return Err(EngineError::validation(format!(
            "domain {} is blocked",
            record.name
        )));
    }
    if record.can_be_restored() {
        return Ok((ItemType::DomainRestore, config.restore_price));
    }
    if record.is_registered() {
        return Ok((ItemType::DomainRenew, config.domain_price));
    }
    Ok((ItemType::DomainRegister, config.domain_price))
}

/// A vetted inbound transfer, ready to be turned into an order item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCheck {
    pub domain_name: String,
    pub price: u64,
    /// The domain is already sponsored by us (or by the auction registrar),
    /// so fulfillment is a local take-over and the transfer is free.
    pub internal: bool,
    pub auth_code: String,
}

impl TransferCheck {
    pub fn to_details(&self) -> ItemDetails {
        ItemDetails::for_transfer(self.auth_code.clone(), self.internal, true)
    }
}

/// One domain's verdict in a bulk transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkTransferOutcome {
    pub domain_name: String,
    pub accepted: bool,
    pub reason: Option<String>,
}

impl OrderCoordinator {
    /// Vet an inbound transfer before creating an order for it.
    ///
    /// Probes the backend with the supplied code and rejects domains we
    /// cannot take: unknown names, wrong codes, transfer locks, transfers
    /// already underway, and owners who cannot afford the price.
    pub fn check_transfer(
        &self,
        domain_name: &str,
        auth_code: &str,
        new_owner: AccountId,
    ) -> EngineResult<TransferCheck> {
        let exec = &self.executor;
        if let Some(record) = exec
            .domains
            .find_by_name(domain_name)
            .map_err(|e| EngineError::storage(e.to_string()))?
        {
            if record.owner == new_owner {
                return Err(EngineError::conflict(format!(
                    "domain {domain_name} already belongs to this account"
                )));
            }
        }
        if exec.store.find_pending_transfer(domain_name)?.is_some() {
            return Err(EngineError::conflict(format!(
                "a transfer of {domain_name} is already in progress"
            )));
        }

        let info = exec
            .registry
            .read_info(domain_name, auth_code)
            .map_err(|e| match e.kind {
                BackendErrorKind::ObjectNotExist => {
                    EngineError::validation(format!("domain {domain_name} does not exist"))
                }
                BackendErrorKind::Authorization => EngineError::validation("invalid transfer code"),
                BackendErrorKind::Rejected => EngineError::validation(e.message),
                BackendErrorKind::Unavailable => EngineError::storage(e.message),
            })?;
        if !info.auth_info_valid {
            return Err(EngineError::validation("invalid transfer code"));
        }
        if info.transfer_prohibited() {
            return Err(EngineError::validation(format!(
                "transfer of {domain_name} is prohibited"
            )));
        }

        let internal = info
            .registrar_id
            .eq_ignore_ascii_case(&exec.config.registrar_id)
            || exec
                .config
                .auction_registrar_id
                .as_deref()
                .is_some_and(|auction| info.registrar_id.eq_ignore_ascii_case(auction));
        let price = if internal { 0 } else { exec.config.domain_price };

        let balance = exec
            .ledger
            .balance_of(new_owner)
            .map_err(|e| EngineError::storage(e.to_string()))?;
        if balance < price {
            return Err(EngineError::validation(ERR_NO_FUNDS));
        }

        Ok(TransferCheck {
            domain_name: domain_name.to_string(),
            price,
            internal,
            auth_code: auth_code.to_string(),
        })
    }

    /// Vet a batch of transfers, place one order covering every accepted
    /// domain, and run an execution pass over it. Rejections are reported
    /// per domain; the whole batch is refused when the owner cannot afford
    /// the accepted total.
    pub fn bulk_transfer(
        &self,
        owner: AccountId,
        requests: &[(String, String)],
    ) -> EngineResult<(Vec<BulkTransferOutcome>, Option<Order>)> {
        let mut report = Vec::with_capacity(requests.len());
        let mut accepted = Vec::new();
        for (domain_name, auth_code) in requests {
            match self.check_transfer(domain_name, auth_code, owner) {
                Ok(check) => {
                    report.push(BulkTransferOutcome {
                        domain_name: domain_name.clone(),
                        accepted: true,
                        reason: None,
                    });
                    accepted.push(check);
                }
                Err(e) => report.push(BulkTransferOutcome {
                    domain_name: domain_name.clone(),
                    accepted: false,
                    reason: Some(e.to_string()),
                }),
            }
        }
        if accepted.is_empty() {
            return Ok((report, None));
        }

        let total: u64 = accepted.iter().map(|c| c.price).sum();
        let balance = self
            .executor
            .ledger
            .balance_of(owner)
            .map_err(|e| EngineError::storage(e.to_string()))?;
        if balance < total {
            return Err(EngineError::validation(ERR_NO_FUNDS));
        }

        let items = accepted
            .into_iter()
            .map(|check| NewOrderItem {
                item_type: ItemType::DomainTransfer,
                price: check.price,
                domain_name: check.domain_name.clone(),
                details: Some(check.to_details()),
            })
            .collect();
        let order = self.create_multi_item_order(owner, items)?;
        let status = self.execute_order(order.id, false)?;
        info!(
            %owner,
            order = %order.id,
            domains = order.items.len(),
            status = ?status,
            "bulk transfer order placed and executed"
        );
        let order = self.executor.store.get(order.id)?;
        Ok((report, Some(order)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namegrid_registry::DomainState;

    fn record(state: DomainState) -> DomainRecord {
        DomainRecord::new("example.com", AccountId::new(), state)
    }

    #[test]
    fn lifecycle_item_follows_domain_state() {
        let config = EngineConfig::default()
            .with_domain_price(100)
            .with_restore_price(250);
        assert_eq!(
            prepare_lifecycle_item(&record(DomainState::Inactive), &config).unwrap(),
            (ItemType::DomainRegister, 100)
        );
        assert_eq!(
            prepare_lifecycle_item(&record(DomainState::Active), &config).unwrap(),
            (ItemType::DomainRenew, 100)
        );
        assert_eq!(
            prepare_lifecycle_item(&record(DomainState::ToBeRestored), &config).unwrap(),
            (ItemType::DomainRestore, 250)
        );
    }

    #[test]
    fn blocked_domain_takes_no_orders() {
        let config = EngineConfig::default();
        assert!(matches!(
            prepare_lifecycle_item(&record(DomainState::Blocked), &config),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn transfer_check_details_carry_code_and_flags() {
        let check = TransferCheck {
            domain_name: "example.com".into(),
            price: 0,
            internal: true,
            auth_code: "abc123".into(),
        };
        let details = check.to_details();
        assert_eq!(details.transfer_code(), Some("abc123"));
        assert!(details.internal());
        assert!(details.rewrite_contacts());
    }
}
