//! Automatic renewal bookkeeping.
//!
//! Each sweep over expiring domains records one `RenewalAttempt` per domain,
//! pointing at the renew (or restore) order it placed. The attempt tracks
//! the expiry dates around the operation and whether the owner was already
//! told about an insufficient balance, so reminder mail goes out once.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use namegrid_billing::{ItemDetails, ItemType, OrderStatus};
use namegrid_core::{AccountId, EngineError, EngineResult, OrderId, RenewalId};
use namegrid_registry::DomainRecord;

use crate::coordinator::OrderCoordinator;
use crate::prepare::prepare_lifecycle_item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalStatus {
    Started,
    Processed,
    /// The owner declined the renewal (e.g. auto-renew switched off after
    /// the attempt was recorded).
    Rejected,
    Failed,
}

/// One automatic renewal attempt for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalAttempt {
    pub id: RenewalId,
    pub created_at: DateTime<Utc>,
    pub domain_name: String,
    pub owner: AccountId,
    pub status: RenewalStatus,
    pub renew_order: Option<OrderId>,
    pub restore_order: Option<OrderId>,
    pub previous_expiry_date: Option<DateTime<Utc>>,
    pub next_expiry_date: Option<DateTime<Utc>>,
    pub insufficient_balance_email_sent: bool,
    pub details: ItemDetails,
}

impl RenewalAttempt {
    pub fn new(domain_name: impl Into<String>, owner: AccountId) -> Self {
        Self {
            id: RenewalId::new(),
            created_at: Utc::now(),
            domain_name: domain_name.into(),
            owner,
            status: RenewalStatus::Started,
            renew_order: None,
            restore_order: None,
            previous_expiry_date: None,
            next_expiry_date: None,
            insufficient_balance_email_sent: false,
            details: ItemDetails::new(),
        }
    }
}

/// In-memory record of renewal attempts.
#[derive(Debug, Default)]
pub struct RenewalBook {
    attempts: RwLock<HashMap<RenewalId, RenewalAttempt>>,
}

impl RenewalBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, attempt: RenewalAttempt) {
        self.attempts
            .write()
            .unwrap()
            .insert(attempt.id, attempt);
    }

    pub fn get(&self, id: RenewalId) -> Option<RenewalAttempt> {
        self.attempts.read().unwrap().get(&id).cloned()
    }

    /// Most recent attempt for a domain, by creation time.
    pub fn latest_for_domain(&self, domain_name: &str) -> Option<RenewalAttempt> {
        self.attempts
            .read()
            .unwrap()
            .values()
            .filter(|a| a.domain_name == domain_name)
            .max_by_key(|a| a.created_at)
            .cloned()
    }

    /// Attempts still awaiting an outcome.
    pub fn pending(&self) -> Vec<RenewalAttempt> {
        self.attempts
            .read()
            .unwrap()
            .values()
            .filter(|a| a.status == RenewalStatus::Started)
            .cloned()
            .collect()
    }

    pub fn set_status(&self, id: RenewalId, status: RenewalStatus) -> bool {
        let mut attempts = self.attempts.write().unwrap();
        match attempts.get_mut(&id) {
            Some(attempt) => {
                attempt.status = status;
                true
            }
            None => false,
        }
    }

    pub fn set_next_expiry(&self, id: RenewalId, expiry: DateTime<Utc>) -> bool {
        let mut attempts = self.attempts.write().unwrap();
        match attempts.get_mut(&id) {
            Some(attempt) => {
                attempt.next_expiry_date = Some(expiry);
                true
            }
            None => false,
        }
    }

    /// Flag the insufficient-balance email as sent. Returns `false` when it
    /// was already flagged, so callers mail at most once per attempt.
    pub fn mark_email_sent(&self, id: RenewalId) -> bool {
        let mut attempts = self.attempts.write().unwrap();
        match attempts.get_mut(&id) {
            Some(attempt) if !attempt.insufficient_balance_email_sent => {
                attempt.insufficient_balance_email_sent = true;
                true
            }
            _ => false,
        }
    }
}

impl OrderCoordinator {
    /// Place the order for one automatic renewal and record the attempt.
    ///
    /// The domain's cached state decides between a renew and a restore; a
    /// domain that is not registered at all cannot be auto-renewed.
    pub fn place_auto_renew_order(
        &self,
        book: &RenewalBook,
        record: &DomainRecord,
    ) -> EngineResult<RenewalAttempt> {
        let (item_type, price) = prepare_lifecycle_item(record, &self.executor.config)?;
        if item_type == ItemType::DomainRegister {
            return Err(EngineError::validation(format!(
                "domain {} is not registered",
                record.name
            )));
        }
        let mut details = ItemDetails::new();
        details.mark_created_automatically();
        let order = self.create_single_item_order(
            record.owner,
            item_type,
            price,
            record.name.clone(),
            Some(details),
        )?;

        let mut attempt = RenewalAttempt::new(record.name.clone(), record.owner);
        attempt.previous_expiry_date = record.expiry_date;
        match item_type {
            ItemType::DomainRestore => attempt.restore_order = Some(order.id),
            _ => attempt.renew_order = Some(order.id),
        }
        info!(
            domain = %record.name,
            owner = %record.owner,
            order = %order.id,
            renewal = %attempt.id,
            "auto-renew order placed"
        );
        book.record(attempt.clone());
        Ok(attempt)
    }

    /// Fold the linked order's fate back into the renewal attempt: a
    /// processed order settles it (capturing the new expiry date from the
    /// domain cache), a failed order fails it, a cancelled order counts as
    /// the owner declining. Anything else leaves the attempt open.
    pub fn resolve_renewal(
        &self,
        book: &RenewalBook,
        renewal_id: RenewalId,
    ) -> EngineResult<RenewalStatus> {
        let attempt = book.get(renewal_id).ok_or(EngineError::NotFound)?;
        let order_id = attempt
            .renew_order
            .or(attempt.restore_order)
            .ok_or(EngineError::NotFound)?;
        let order = self.executor.store.get(order_id)?;
        let status = match order.status {
            OrderStatus::Processed => {
                if let Ok(Some(record)) = self.executor.domains.find_by_name(&attempt.domain_name) {
                    if let Some(expiry) = record.expiry_date {
                        book.set_next_expiry(renewal_id, expiry);
                    }
                }
                RenewalStatus::Processed
            }
            OrderStatus::Failed => RenewalStatus::Failed,
            OrderStatus::Cancelled => RenewalStatus::Rejected,
            _ => RenewalStatus::Started,
        };
        if status != RenewalStatus::Started {
            book.set_status(renewal_id, status);
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(name: &str) -> RenewalAttempt {
        RenewalAttempt::new(name, AccountId::new())
    }

    #[test]
    fn latest_attempt_wins_by_creation_time() {
        let book = RenewalBook::new();
        let mut first = attempt("example.com");
        first.created_at = Utc::now() - chrono::Duration::hours(1);
        let second = attempt("example.com");
        book.record(first);
        book.record(second.clone());
        book.record(attempt("other.com"));

        assert_eq!(book.latest_for_domain("example.com").unwrap().id, second.id);
        assert!(book.latest_for_domain("missing.com").is_none());
    }

    #[test]
    fn pending_lists_only_started_attempts() {
        let book = RenewalBook::new();
        let a = attempt("a.com");
        let b = attempt("b.com");
        let a_id = a.id;
        book.record(a);
        book.record(b);
        book.set_status(a_id, RenewalStatus::Processed);

        let pending = book.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].domain_name, "b.com");
    }

    #[test]
    fn insufficient_balance_email_goes_out_once() {
        let book = RenewalBook::new();
        let a = attempt("a.com");
        let id = a.id;
        book.record(a);

        assert!(book.mark_email_sent(id));
        assert!(!book.mark_email_sent(id));
        assert!(book.get(id).unwrap().insufficient_balance_email_sent);
    }

    #[test]
    fn status_updates_require_a_known_attempt() {
        let book = RenewalBook::new();
        assert!(!book.set_status(RenewalId::new(), RenewalStatus::Failed));
        assert!(!book.set_next_expiry(RenewalId::new(), Utc::now()));
    }
}
