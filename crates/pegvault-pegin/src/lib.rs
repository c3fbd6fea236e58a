//! PegVault peg-in orchestration
//!
//! Drives a peg-in from a split wallet output to a live vault:
//!
//! 1. [`prepare_pegin_from_split_output`] - build and fund the peg-in
//! 2. [`register_split_pegin_on_chain`] - register it with the vault contract
//! 3. [`sign_payout_transactions`] - pre-sign both payout paths
//! 4. [`broadcast_pegin_with_local_utxo`] - sign the peg-in and broadcast it
//! 5. [`fetch_inclusion_proof`] - wait for confirmation
//!
//! Progress is tracked locally in a [`PeginStore`] and merged with the
//! contract status by [`peg_in_display_state`]. Every step can be re-run
//! after a failure; tracked status never moves backwards.

pub mod broadcast;
pub mod confirmation;
pub mod error;
pub mod prepare;
pub mod register;
pub mod signing;
pub mod state;
pub mod store;
pub mod traits;

#[cfg(test)]
mod test_utils;

pub use broadcast::{broadcast_pegin_with_local_utxo, BroadcastPeginParams};
pub use confirmation::{fetch_inclusion_proof, InclusionProof};
pub use error::{ErrorKind, PeginError, ServiceError};
pub use prepare::{prepare_pegin_from_split_output, PreparePeginParams, PreparedPegin};
pub use register::{
    register_split_pegin_on_chain, PopSignedCallback, RegistrationRequest, RegistrationResult,
};
pub use signing::{sign_payout_transactions, PayoutSignatures, PayoutSigningParams};
pub use state::{
    peg_in_display_state, status_after, ContractStatus, DisplayVariant, LocalStorageStatus,
    PeginAction, PeginDisplayState,
};
pub use store::{PeginStore, PendingPeginRequest, StoreError};
pub use traits::{
    Broadcaster, ChainQuery, LocalScriptService, PsbtSigner, RegistrationClient, ScriptService,
};
