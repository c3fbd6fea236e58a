//! Error types for transaction construction

use thiserror::Error;

/// Errors from selection, funding, payout construction and signature extraction.
///
/// Messages are carried verbatim so callers can wrap them with context
/// without doubling up prefixes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    /// Malformed input: bad hex, wrong input count, bad signature length.
    #[error("{0}")]
    Validation(String),

    /// A referenced output or signature could not be located.
    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient funds: need {needed} sat, have {available} sat")]
    InsufficientFunds { needed: u64, available: u64 },
}

impl TxError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        TxError::Validation(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        TxError::NotFound(msg.into())
    }
}
