//! Per-domain mutual exclusion.
//!
//! The registry backend is the source of truth, so two in-flight operations
//! on the same domain name could double-submit or double-charge. A lease is
//! acquired before any item execution begins and released when the guard
//! drops, including on panic.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Set of domain names currently being executed.
#[derive(Debug, Default)]
pub struct DomainLeaseSet {
    in_flight: Mutex<HashSet<String>>,
}

impl DomainLeaseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the domain name. Returns `None` when another execution
    /// already holds it.
    pub fn acquire(self: &Arc<Self>, domain_name: &str) -> Option<DomainLease> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if !in_flight.insert(domain_name.to_string()) {
            return None;
        }
        debug!(domain = domain_name, "acquired domain lease");
        Some(DomainLease {
            set: Arc::clone(self),
            domain_name: domain_name.to_string(),
        })
    }

    pub fn is_held(&self, domain_name: &str) -> bool {
        self.in_flight.lock().unwrap().contains(domain_name)
    }
}

/// Guard for one in-flight domain operation.
#[derive(Debug)]
pub struct DomainLease {
    set: Arc<DomainLeaseSet>,
    domain_name: String,
}

impl Drop for DomainLease {
    fn drop(&mut self) {
        self.set.in_flight.lock().unwrap().remove(&self.domain_name);
        debug!(domain = %self.domain_name, "released domain lease");
    }
}
