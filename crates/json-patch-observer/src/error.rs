//! Error types.

use thiserror::Error;

/// Caller misuse of the observer API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidUsage {
    #[error("you need to either record changes or pass a callback")]
    NothingToEmit,
    #[error("you should set record to true to get patches later")]
    NotRecording,
    #[error("the observer is already observing its root")]
    AlreadyObserving,
    #[error("the observed root must be an object or an array")]
    RootNotContainer,
}

/// Errors returned by observers and wrapped nodes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserverError {
    #[error(transparent)]
    InvalidUsage(#[from] InvalidUsage),
    /// Any access through a handle after [`Observer::revoke`](crate::Observer::revoke).
    #[error("cannot perform an operation on a revoked node")]
    Revoked,
    #[error("member '{key}' is not an object or an array")]
    NotAContainer { key: String },
    #[error("operation requires an array")]
    NotAnArray,
    #[error("invalid array length: {0}")]
    InvalidLength(String),
    #[error("assigning '{key}' would make the tree cyclic")]
    Cycle { key: String },
    #[error("invalid patch operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T, E = ObserverError> = std::result::Result<T, E>;
