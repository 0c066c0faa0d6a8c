//! Locally cached domain and contact repositories.
//!
//! The in-memory implementations are intended for tests/dev; hosts provide
//! their own persistence behind the same traits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use namegrid_accounts::AccountProfile;
use namegrid_core::{AccountId, ContactId};

use crate::domain::{Contact, ContactRole, DomainRecord};

/// Repository operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("domain not found: {0}")]
    DomainNotFound(String),

    #[error("repository storage failure: {0}")]
    Storage(String),
}

/// Lookup/mutation of locally cached domain records.
pub trait DomainRepository: Send + Sync {
    fn find_by_name(&self, name: &str) -> Result<Option<DomainRecord>, RepositoryError>;

    /// Load the current record, failing if the domain is unknown.
    fn reload(&self, name: &str) -> Result<DomainRecord, RepositoryError>;

    /// Reassign the registrant contact. `force` skips the same-owner check
    /// (take-overs reassign across accounts).
    fn change_registrant(
        &self,
        name: &str,
        contact: ContactId,
        force: bool,
    ) -> Result<(), RepositoryError>;

    fn detach_contact(&self, name: &str, role: ContactRole) -> Result<(), RepositoryError>;

    fn join_contact(
        &self,
        name: &str,
        role: ContactRole,
        contact: ContactId,
    ) -> Result<(), RepositoryError>;

    /// Write the full record back.
    fn persist(&self, record: &DomainRecord) -> Result<(), RepositoryError>;
}

/// Contacts owned by accounts.
pub trait ContactRepository: Send + Sync {
    /// The account's oldest contact, used as the registrant on take-overs.
    fn oldest_registrant(&self, owner: AccountId) -> Result<Option<Contact>, RepositoryError>;

    fn first_contact_of(&self, owner: AccountId) -> Result<Option<Contact>, RepositoryError>;

    /// Create a contact seeded from the account's profile.
    fn create_from_profile(
        &self,
        owner: AccountId,
        profile: &AccountProfile,
    ) -> Result<Contact, RepositoryError>;
}

impl<R> DomainRepository for Arc<R>
where
    R: DomainRepository + ?Sized,
{
    fn find_by_name(&self, name: &str) -> Result<Option<DomainRecord>, RepositoryError> {
        (**self).find_by_name(name)
    }

    fn reload(&self, name: &str) -> Result<DomainRecord, RepositoryError> {
        (**self).reload(name)
    }

    fn change_registrant(
        &self,
        name: &str,
        contact: ContactId,
        force: bool,
    ) -> Result<(), RepositoryError> {
        (**self).change_registrant(name, contact, force)
    }

    fn detach_contact(&self, name: &str, role: ContactRole) -> Result<(), RepositoryError> {
        (**self).detach_contact(name, role)
    }

    fn join_contact(
        &self,
        name: &str,
        role: ContactRole,
        contact: ContactId,
    ) -> Result<(), RepositoryError> {
        (**self).join_contact(name, role, contact)
    }

    fn persist(&self, record: &DomainRecord) -> Result<(), RepositoryError> {
        (**self).persist(record)
    }
}

impl<R> ContactRepository for Arc<R>
where
    R: ContactRepository + ?Sized,
{
    fn oldest_registrant(&self, owner: AccountId) -> Result<Option<Contact>, RepositoryError> {
        (**self).oldest_registrant(owner)
    }

    fn first_contact_of(&self, owner: AccountId) -> Result<Option<Contact>, RepositoryError> {
        (**self).first_contact_of(owner)
    }

    fn create_from_profile(
        &self,
        owner: AccountId,
        profile: &AccountProfile,
    ) -> Result<Contact, RepositoryError> {
        (**self).create_from_profile(owner, profile)
    }
}

/// In-memory domain repository keyed by domain name.
#[derive(Debug, Default)]
pub struct InMemoryDomainRepository {
    records: RwLock<HashMap<String, DomainRecord>>,
}

impl InMemoryDomainRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: DomainRecord) {
        self.records
            .write()
            .unwrap()
            .insert(record.name.clone(), record);
    }

    pub fn remove(&self, name: &str) -> Option<DomainRecord> {
        self.records.write().unwrap().remove(name)
    }

    fn with_record<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut DomainRecord) -> T,
    ) -> Result<T, RepositoryError> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(name)
            .ok_or_else(|| RepositoryError::DomainNotFound(name.to_string()))?;
        Ok(f(record))
    }
}

impl DomainRepository for InMemoryDomainRepository {
    fn find_by_name(&self, name: &str) -> Result<Option<DomainRecord>, RepositoryError> {
        Ok(self.records.read().unwrap().get(name).cloned())
    }

    fn reload(&self, name: &str) -> Result<DomainRecord, RepositoryError> {
        self.find_by_name(name)?
            .ok_or_else(|| RepositoryError::DomainNotFound(name.to_string()))
    }

    fn change_registrant(
        &self,
        name: &str,
        contact: ContactId,
        force: bool,
    ) -> Result<(), RepositoryError> {
        self.with_record(name, |record| {
            record.registrant = Some(contact);
            debug!(domain = name, %contact, force, "changed registrant");
        })
    }

    fn detach_contact(&self, name: &str, role: ContactRole) -> Result<(), RepositoryError> {
        self.with_record(name, |record| {
            record.contacts.remove(&role);
        })
    }

    fn join_contact(
        &self,
        name: &str,
        role: ContactRole,
        contact: ContactId,
    ) -> Result<(), RepositoryError> {
        self.with_record(name, |record| {
            record.contacts.insert(role, contact);
        })
    }

    fn persist(&self, record: &DomainRecord) -> Result<(), RepositoryError> {
        self.records
            .write()
            .unwrap()
            .insert(record.name.clone(), record.clone());
        Ok(())
    }
}

/// In-memory contact repository; insertion order doubles as creation order.
#[derive(Debug, Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<Vec<Contact>>,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, contact: Contact) {
        self.contacts.write().unwrap().push(contact);
    }
}

impl ContactRepository for InMemoryContactRepository {
    fn oldest_registrant(&self, owner: AccountId) -> Result<Option<Contact>, RepositoryError> {
        let contacts = self.contacts.read().unwrap();
        Ok(contacts
            .iter()
            .filter(|c| c.owner == owner)
            .min_by_key(|c| c.created_at)
            .cloned())
    }

    fn first_contact_of(&self, owner: AccountId) -> Result<Option<Contact>, RepositoryError> {
        let contacts = self.contacts.read().unwrap();
        Ok(contacts.iter().find(|c| c.owner == owner).cloned())
    }

    fn create_from_profile(
        &self,
        owner: AccountId,
        profile: &AccountProfile,
    ) -> Result<Contact, RepositoryError> {
        let contact = Contact {
            id: ContactId::new(),
            owner,
            person_name: profile.person_name.clone(),
            email: profile.email.clone(),
            created_at: Utc::now(),
        };
        debug!(%owner, contact = %contact.id, "created contact from profile");
        self.contacts.write().unwrap().push(contact.clone());
        Ok(contact)
    }
}
