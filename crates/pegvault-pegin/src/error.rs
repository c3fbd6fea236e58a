//! Error types for peg-in orchestration

use pegvault_script::ScriptError;
use pegvault_tx::TxError;
use thiserror::Error;

use crate::store::StoreError;

/// Failure reported by an external collaborator (signer, broadcaster,
/// chain index, registration contract).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Coarse classification of a [`PeginError`], stable across wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    ExternalService,
    Mismatch,
    Storage,
}

/// Errors from peg-in orchestration
#[derive(Error, Debug)]
pub enum PeginError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient funds: need {needed} sat, have {available} sat")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error(transparent)]
    ExternalService(#[from] ServiceError),

    /// A computed transaction id differs from the one the caller expects
    #[error("Transaction id mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to {operation}: {source}")]
    Operation {
        operation: &'static str,
        source: Box<PeginError>,
    },
}

impl PeginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PeginError::Validation(_) => ErrorKind::Validation,
            PeginError::NotFound(_) => ErrorKind::NotFound,
            PeginError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            PeginError::ExternalService(_) => ErrorKind::ExternalService,
            PeginError::Mismatch { .. } => ErrorKind::Mismatch,
            PeginError::Store(_) => ErrorKind::Storage,
            PeginError::Operation { source, .. } => source.kind(),
        }
    }

    /// Prefix the error with the operation that failed.
    ///
    /// Already-wrapped errors are left alone so nested orchestration steps
    /// don't stack prefixes.
    pub fn during(self, operation: &'static str) -> Self {
        match self {
            PeginError::Operation { .. } => self,
            other => PeginError::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        PeginError::Validation(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        PeginError::NotFound(msg.into())
    }
}

impl From<TxError> for PeginError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::Validation(msg) => PeginError::Validation(msg),
            TxError::NotFound(msg) => PeginError::NotFound(msg),
            TxError::InsufficientFunds { needed, available } => {
                PeginError::InsufficientFunds { needed, available }
            }
        }
    }
}

impl From<ScriptError> for PeginError {
    fn from(e: ScriptError) -> Self {
        PeginError::Validation(e.to_string())
    }
}
