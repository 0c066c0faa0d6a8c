use serde::{Deserialize, Serialize};

use namegrid_core::AccountId;

/// Registrant profile data used to seed new contacts for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub person_name: String,
    pub organization: Option<String>,
    pub email: String,
    pub country: Option<String>,
}

impl AccountProfile {
    pub fn new(person_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            person_name: person_name.into(),
            organization: None,
            email: email.into(),
            country: None,
        }
    }
}

/// A paying customer account.
///
/// The balance itself lives behind the ledger adapter; this record carries
/// identity and profile data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub profile: AccountProfile,
}

impl Account {
    pub fn new(email: impl Into<String>, profile: AccountProfile) -> Self {
        Self {
            id: AccountId::new(),
            email: email.into(),
            profile,
        }
    }
}

/// Account lookup used by the engine to reach profile data.
pub trait AccountDirectory: Send + Sync {
    fn find(&self, id: AccountId) -> Option<Account>;
}

impl<D> AccountDirectory for std::sync::Arc<D>
where
    D: AccountDirectory + ?Sized,
{
    fn find(&self, id: AccountId) -> Option<Account> {
        (**self).find(id)
    }
}

/// In-memory account directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: std::sync::RwLock<std::collections::HashMap<AccountId, Account>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: Account) {
        self.accounts.write().unwrap().insert(account.id, account);
    }
}

impl AccountDirectory for InMemoryAccountDirectory {
    fn find(&self, id: AccountId) -> Option<Account> {
        self.accounts.read().unwrap().get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_returns_inserted_accounts() {
        let directory = InMemoryAccountDirectory::new();
        let account = Account::new("bob@example.com", AccountProfile::new("Bob", "bob@example.com"));
        let id = account.id;
        directory.insert(account);
        assert_eq!(directory.find(id).unwrap().email, "bob@example.com");
        assert!(directory.find(AccountId::new()).is_none());
    }

    #[test]
    fn account_carries_profile() {
        let account = Account::new("alice@example.com", AccountProfile::new("Alice", "alice@example.com"));
        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.profile.person_name, "Alice");
    }
}
