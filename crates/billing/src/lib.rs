//! `namegrid-billing` — pure billing domain model.
//!
//! Orders, order items, their status lifecycles, the merge-only `details`
//! record, and the deterministic rules that fold item statuses into an order
//! status. No IO and no registry concerns; the engine crate drives these
//! types against the external collaborators.

pub mod aggregation;
pub mod details;
pub mod order;
pub mod outcome;
pub mod receipt;

pub use aggregation::{refresh_status, ExecutionTally};
pub use details::ItemDetails;
pub use order::{ItemType, NewOrderItem, Order, OrderItem, OrderItemStatus, OrderStatus};
pub use outcome::ItemOutcome;
pub use receipt::{ReceiptData, ReceiptLine};
