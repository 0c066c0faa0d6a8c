//! `namegrid-core` — shared foundation for the order fulfillment engine.
//!
//! This crate contains only identifiers and the caller-facing error taxonomy.
//! No registry, billing, or storage concerns belong here.

pub mod error;
pub mod id;

pub use error::{EngineError, EngineResult};
pub use id::{AccountId, ContactId, OrderId, OrderItemId, RenewalId};
