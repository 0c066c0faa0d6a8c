//! Caller-facing error model.
//!
//! Faults that happen *inside* item execution never surface here: the item
//! executor converts them into item statuses and `details.error` text. This
//! enum covers the creation/lookup/cancel paths where the engine does raise.

use thiserror::Error;

/// Result type used across the engine's caller-facing API.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error returned to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A value failed validation (e.g. empty item list, blocked domain).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested order or record was not found.
    #[error("not found")]
    NotFound,

    /// The operation conflicts with current state (e.g. cancelling a charged
    /// order, duplicate register item for the same domain name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller does not own the order it tried to touch.
    #[error("unauthorized")]
    Unauthorized,

    /// The backing store rejected the operation.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
