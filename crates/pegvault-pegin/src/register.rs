//! On-chain registration of a split peg-in.

use std::fmt;
use std::sync::Arc;

use pegvault_script::normalize_xonly_hex;
use pegvault_tx::decode_transaction;
use serde::{Deserialize, Serialize};

use crate::error::PeginError;
use crate::traits::RegistrationClient;

const OPERATION: &str = "register peg-in on chain";

/// Called once the depositor has signed the proof of possession.
pub type PopSignedCallback = Arc<dyn Fn() + Send + Sync>;

/// What the registration contract needs to know about a peg-in.
#[derive(Clone)]
pub struct RegistrationRequest {
    /// x-only, 64 lowercase hex characters
    pub depositor_btc_pubkey: String,
    pub unsigned_btc_tx: String,
    /// Vault provider identity on the registration chain
    pub vault_provider: String,
    pub on_pop_signed: Option<PopSignedCallback>,
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("depositor_btc_pubkey", &self.depositor_btc_pubkey)
            .field("unsigned_btc_tx", &self.unsigned_btc_tx)
            .field("vault_provider", &self.vault_provider)
            .field("on_pop_signed", &self.on_pop_signed.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResult {
    pub eth_tx_hash: String,
    pub vault_id: String,
}

/// Register a peg-in with the vault contract.
///
/// The depositor key is normalized and the transaction must decode before
/// the client is contacted. The client's result is returned unchanged.
pub async fn register_split_pegin_on_chain(
    client: &dyn RegistrationClient,
    request: RegistrationRequest,
) -> Result<RegistrationResult, PeginError> {
    register(client, request)
        .await
        .map_err(|e| e.during(OPERATION))
}

async fn register(
    client: &dyn RegistrationClient,
    mut request: RegistrationRequest,
) -> Result<RegistrationResult, PeginError> {
    request.depositor_btc_pubkey = normalize_xonly_hex(&request.depositor_btc_pubkey)?;
    let tx = decode_transaction(&request.unsigned_btc_tx)?;
    if request.vault_provider.trim().is_empty() {
        return Err(PeginError::validation("Vault provider is required"));
    }

    let result = client.register_pegin(&request).await?;
    log::info!(
        "Registered peg-in {} as vault {} ({})",
        tx.compute_txid(),
        result.vault_id,
        result.eth_tx_hash
    );
    Ok(result)
}
