//! Registry backend client contract.
//!
//! Every lifecycle operation returns the ordered step logs of the remote
//! round trips it performed. The original exposed outcomes as "a list whose
//! last element may be falsy or an exception"; here the outcome is the
//! `Result` itself and `BackendError` still carries the steps that ran
//! before the failure, so callers can persist the full chain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use namegrid_core::AccountId;

use crate::domain::DomainRecord;

/// One remote step performed during a backend operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLog {
    /// Short operation name, e.g. "domain_check" or "contact_update".
    pub operation: String,
    /// Raw response summary, kept for diagnosis in item details.
    pub message: String,
}

impl StepLog {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl core::fmt::Display for StepLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.operation, self.message)
    }
}

/// Classified backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    /// The supplied auth info was rejected.
    Authorization,
    /// The object does not exist at the backend.
    ObjectNotExist,
    /// The backend refused the command (policy, locks, bad state).
    Rejected,
    /// Transport/session failure; retrying later may help.
    Unavailable,
}

/// A failed backend operation, including the steps that ran before it failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("backend operation failed ({kind:?}): {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
    pub steps: Vec<StepLog>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<StepLog>) -> Self {
        self.steps = steps;
        self
    }

    /// Step chain including the failure itself, for item details.
    pub fn output_chain(&self) -> Vec<String> {
        let mut outputs: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        outputs.push(format!("error: {}", self.message));
        outputs
    }
}

pub type BackendResult = Result<Vec<StepLog>, BackendError>;

/// Result of a `read_info` probe against the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    pub name: String,
    /// Registrar currently sponsoring the domain.
    pub registrar_id: String,
    /// Raw status values, e.g. "clientTransferProhibited".
    pub statuses: Vec<String>,
    /// Whether the auth info supplied to the probe was accepted.
    pub auth_info_valid: bool,
}

impl DomainInfo {
    pub fn transfer_prohibited(&self) -> bool {
        self.statuses
            .iter()
            .any(|s| s == "clientTransferProhibited" || s == "serverTransferProhibited")
    }
}

/// Options for the check-create-update-renew composite operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewOptions {
    pub sync_contacts: bool,
    pub sync_nameservers: bool,
    pub renew_years: u32,
}

/// Options for a full synchronization of a domain from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub refresh_contacts: bool,
    pub rewrite_contacts: bool,
    pub change_owner_allowed: bool,
    pub create_new_owner_allowed: bool,
    pub soft_delete: bool,
    pub domain_transferred_away: bool,
    pub expected_owner: Option<AccountId>,
}

impl SyncOptions {
    pub fn with_refresh_contacts(mut self, value: bool) -> Self {
        self.refresh_contacts = value;
        self
    }

    pub fn with_rewrite_contacts(mut self, value: bool) -> Self {
        self.rewrite_contacts = value;
        self
    }

    pub fn with_change_owner_allowed(mut self, value: bool) -> Self {
        self.change_owner_allowed = value;
        self
    }

    pub fn with_create_new_owner_allowed(mut self, value: bool) -> Self {
        self.create_new_owner_allowed = value;
        self
    }

    pub fn with_soft_delete(mut self, value: bool) -> Self {
        self.soft_delete = value;
        self
    }

    pub fn with_expected_owner(mut self, owner: AccountId) -> Self {
        self.expected_owner = Some(owner);
        self
    }
}

/// Options for pushing contact state to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSyncOptions {
    pub merge_duplicates: bool,
    pub rewrite_registrant: bool,
    pub new_registrant: Option<namegrid_core::ContactId>,
}

/// Domain lifecycle operations against the registry backend.
///
/// Calls block for the duration of the remote round trip; the engine holds
/// no internal pool and relies on the caller's threading. Implementations
/// must be safe to share across threads.
pub trait RegistryClient: Send + Sync {
    /// Composite check/create/update/renew used for both registrations and
    /// renewals; the backend decides which steps apply.
    fn check_create_update_renew(
        &self,
        domain: &DomainRecord,
        options: &RenewOptions,
    ) -> BackendResult;

    /// Restore an expired domain from redemption, with a human-readable reason.
    fn restore(&self, domain: &DomainRecord, reason: &str) -> BackendResult;

    /// Request an inbound transfer; completion is asynchronous.
    fn transfer_request(&self, domain_name: &str, auth_info: &str) -> BackendResult;

    /// Probe a domain with auth info, without mutating anything.
    fn read_info(&self, domain_name: &str, auth_info: &str) -> Result<DomainInfo, BackendError>;

    /// Pull the authoritative state of a domain into the local cache.
    fn synchronize_from_backend(&self, domain_name: &str, options: &SyncOptions) -> BackendResult;

    /// Push local contact assignments to the backend.
    fn synchronize_contacts(
        &self,
        domain: &DomainRecord,
        options: &ContactSyncOptions,
    ) -> BackendResult;

    /// Regenerate the domain's transfer authorization key at the backend.
    fn set_auth_info(&self, domain: &DomainRecord) -> BackendResult;
}

impl<C> RegistryClient for Arc<C>
where
    C: RegistryClient + ?Sized,
{
    fn check_create_update_renew(
        &self,
        domain: &DomainRecord,
        options: &RenewOptions,
    ) -> BackendResult {
        (**self).check_create_update_renew(domain, options)
    }

    fn restore(&self, domain: &DomainRecord, reason: &str) -> BackendResult {
        (**self).restore(domain, reason)
    }

    fn transfer_request(&self, domain_name: &str, auth_info: &str) -> BackendResult {
        (**self).transfer_request(domain_name, auth_info)
    }

    fn read_info(&self, domain_name: &str, auth_info: &str) -> Result<DomainInfo, BackendError> {
        (**self).read_info(domain_name, auth_info)
    }

    fn synchronize_from_backend(&self, domain_name: &str, options: &SyncOptions) -> BackendResult {
        (**self).synchronize_from_backend(domain_name, options)
    }

    fn synchronize_contacts(
        &self,
        domain: &DomainRecord,
        options: &ContactSyncOptions,
    ) -> BackendResult {
        (**self).synchronize_contacts(domain, options)
    }

    fn set_auth_info(&self, domain: &DomainRecord) -> BackendResult {
        (**self).set_auth_info(domain)
    }
}
