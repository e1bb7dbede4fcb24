use thiserror::Error;

/// Errors produced by type parsing and arithmetic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid amount {value:?}: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("invalid rate {value:?}: {reason}")]
    InvalidRate { value: String, reason: String },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown sync status: {0}")]
    UnknownSyncStatus(String),

    #[error("amount overflow")]
    Overflow,
}
