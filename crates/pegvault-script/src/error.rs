//! Error types for script construction

use thiserror::Error;

/// Errors that can occur while building vault scripts and skeletons
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("At least one vault keeper is required")]
    NoVaultKeepers,

    #[error("Peg-in amount must be greater than zero")]
    ZeroAmount,

    #[error("Taproot construction failed: {0}")]
    Taproot(String),
}
