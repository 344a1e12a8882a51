//! Error types for the Marquee state layer.

use thiserror::Error;

use crate::types::InstanceStatus;

/// Result type alias for raw key-value store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for repository and entity operations.
pub type StateResult<T> = Result<T, StateError>;

/// Failures reported by the underlying key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),
}

/// Errors surfaced by the instance repository and the status state machine.
#[derive(Debug, Error)]
pub enum StateError {
    /// No record exists at the key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record exists at the key but does not decode.
    #[error("malformed record at {path}: {reason}")]
    MalformedData { path: String, reason: String },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: InstanceStatus,
        to: InstanceStatus,
    },
}

impl StateError {
    /// True when the error means "no such instance".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound(_))
    }
}
