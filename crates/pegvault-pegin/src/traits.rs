//! Collaborator interfaces.
//!
//! Everything that talks to a wallet, a node or a contract sits behind one
//! of these traits so the orchestration stays testable in-process.

use async_trait::async_trait;
use bitcoin::{Script, Txid};
use pegvault_script::{new_unfunded_pegin_tx, PegInParams, UnfundedPegin};

use crate::confirmation::InclusionProof;
use crate::error::ServiceError;
use crate::register::{RegistrationRequest, RegistrationResult};

/// Builds the vault script and unfunded peg-in skeleton.
pub trait ScriptService: Send + Sync {
    fn create_unfunded_pegin(&self, params: &PegInParams) -> Result<UnfundedPegin, ServiceError>;
}

/// [`ScriptService`] backed by the in-process script builder.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalScriptService;

impl ScriptService for LocalScriptService {
    fn create_unfunded_pegin(&self, params: &PegInParams) -> Result<UnfundedPegin, ServiceError> {
        new_unfunded_pegin_tx(params).map_err(|e| ServiceError::new(e.to_string()))
    }
}

/// Signs PSBTs on behalf of the depositor.
///
/// Implementations may return hex or base64; rejection (e.g. the user
/// closing a signing prompt) is reported as an error.
#[async_trait]
pub trait PsbtSigner: Send + Sync {
    async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, ServiceError>;
}

/// Submits a fully signed transaction to the network.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn push_tx(&self, tx_hex: &str) -> Result<Txid, ServiceError>;
}

/// Read-only chain lookups.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Merkle inclusion proof for `txid`, or `None` while unconfirmed.
    ///
    /// `script_pubkey` is any output script of the transaction; indexers
    /// that key history by script use it to find the confirmation height.
    async fn inclusion_proof(
        &self,
        txid: &Txid,
        script_pubkey: &Script,
    ) -> Result<Option<InclusionProof>, ServiceError>;
}

/// Registers a peg-in with the vault contract.
#[async_trait]
pub trait RegistrationClient: Send + Sync {
    async fn register_pegin(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResult, ServiceError>;
}
