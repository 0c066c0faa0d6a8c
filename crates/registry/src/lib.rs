//! `namegrid-registry` — contracts to the external registry backend and the
//! locally cached domain/contact records that mirror it.
//!
//! The engine depends on these interfaces; the wire protocol behind
//! `RegistryClient` (EPP or otherwise) is a host concern.

pub mod client;
pub mod domain;
pub mod repo;

pub use client::{
    BackendError, BackendErrorKind, BackendResult, ContactSyncOptions, DomainInfo, RegistryClient,
    RenewOptions, StepLog, SyncOptions,
};
pub use domain::{Contact, ContactRole, DomainRecord, DomainState};
pub use repo::{
    ContactRepository, DomainRepository, InMemoryContactRepository, InMemoryDomainRepository,
    RepositoryError,
};
