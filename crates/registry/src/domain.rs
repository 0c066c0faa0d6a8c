use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use namegrid_core::{AccountId, ContactId};

/// Contact role on a domain. The registrant is tracked separately on the
/// record because reassigning it has its own rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactRole {
    Admin,
    Billing,
    Tech,
}

impl ContactRole {
    pub const ALL: [ContactRole; 3] = [ContactRole::Admin, ContactRole::Billing, ContactRole::Tech];
}

/// A registrant/admin/tech contact record owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub owner: AccountId,
    pub person_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Registration state of a locally cached domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainState {
    /// Known locally but not registered at the backend.
    Inactive,
    /// Registered and in good standing.
    Active,
    /// Expired but inside the redemption window.
    ToBeRestored,
    /// Administratively blocked; no lifecycle operations allowed.
    Blocked,
}

/// Locally cached mirror of a registry domain object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub name: String,
    pub owner: AccountId,
    pub state: DomainState,
    /// Single-use transfer authorization key; cleared once consumed.
    pub auth_key: Option<String>,
    pub registrant: Option<ContactId>,
    pub contacts: BTreeMap<ContactRole, ContactId>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl DomainRecord {
    pub fn new(name: impl Into<String>, owner: AccountId, state: DomainState) -> Self {
        Self {
            name: name.into(),
            owner,
            state,
            auth_key: None,
            registrant: None,
            contacts: BTreeMap::new(),
            expiry_date: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.state, DomainState::Active)
    }

    pub fn can_be_restored(&self) -> bool {
        matches!(self.state, DomainState::ToBeRestored)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.state, DomainState::Blocked)
    }

    pub fn contact(&self, role: ContactRole) -> Option<ContactId> {
        self.contacts.get(&role).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_helpers_follow_lifecycle() {
        let owner = AccountId::new();
        let mut record = DomainRecord::new("example.com", owner, DomainState::Active);
        assert!(record.is_registered());
        assert!(!record.can_be_restored());

        record.state = DomainState::ToBeRestored;
        assert!(record.can_be_restored());
        assert!(!record.is_registered());

        record.state = DomainState::Blocked;
        assert!(record.is_blocked());
    }

    #[test]
    fn contacts_are_tracked_per_role() {
        let owner = AccountId::new();
        let mut record = DomainRecord::new("example.com", owner, DomainState::Active);
        let admin = ContactId::new();
        record.contacts.insert(ContactRole::Admin, admin);
        assert_eq!(record.contact(ContactRole::Admin), Some(admin));
        assert_eq!(record.contact(ContactRole::Tech), None);
    }
}
