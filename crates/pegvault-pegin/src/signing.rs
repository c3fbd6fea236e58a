//! Depositor signatures over both payout paths.

use bitcoin::ScriptBuf;
use pegvault_script::{parse_xonly, unspendable_key};
use pegvault_tx::{
    build_payout_psbt_hex, extract_payout_signature, PayoutKind, PayoutPsbtParams,
};
use serde::{Deserialize, Serialize};

use crate::error::PeginError;
use crate::traits::PsbtSigner;

const OPERATION: &str = "sign payout transactions";

/// Transactions the vault provider publishes for the depositor to sign.
#[derive(Debug, Clone)]
pub struct PayoutSigningParams<'a> {
    pub depositor_pubkey: &'a str,
    /// Vault payout leaf, hex
    pub payout_script_hex: &'a str,
    pub pegin_tx_hex: &'a str,
    pub optimistic_payout_tx_hex: &'a str,
    pub claim_tx_hex: &'a str,
    pub challenge_payout_tx_hex: &'a str,
    pub assert_tx_hex: &'a str,
}

/// Depositor Schnorr signatures, 128 hex characters each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSignatures {
    pub optimistic: String,
    pub challenge: String,
}

/// Build both payout PSBTs, have the depositor sign them, and extract the
/// depositor's signature from each.
pub async fn sign_payout_transactions(
    signer: &dyn PsbtSigner,
    params: &PayoutSigningParams<'_>,
) -> Result<PayoutSignatures, PeginError> {
    sign(signer, params).await.map_err(|e| e.during(OPERATION))
}

async fn sign(
    signer: &dyn PsbtSigner,
    params: &PayoutSigningParams<'_>,
) -> Result<PayoutSignatures, PeginError> {
    let depositor = parse_xonly(params.depositor_pubkey)?;
    let payout_script = hex::decode(params.payout_script_hex.trim())
        .map(ScriptBuf::from_bytes)
        .map_err(|e| PeginError::validation(format!("Invalid payout script hex: {}", e)))?;

    let optimistic_psbt = build_payout_psbt_hex(&PayoutPsbtParams {
        kind: PayoutKind::Optimistic,
        payout_tx_hex: params.optimistic_payout_tx_hex,
        pegin_tx_hex: params.pegin_tx_hex,
        second_tx_hex: params.claim_tx_hex,
        payout_script: &payout_script,
        internal_key: *unspendable_key(),
    })?;
    let challenge_psbt = build_payout_psbt_hex(&PayoutPsbtParams {
        kind: PayoutKind::Challenge,
        payout_tx_hex: params.challenge_payout_tx_hex,
        pegin_tx_hex: params.pegin_tx_hex,
        second_tx_hex: params.assert_tx_hex,
        payout_script: &payout_script,
        internal_key: *unspendable_key(),
    })?;

    let signed = signer.sign_psbt(&optimistic_psbt).await?;
    let optimistic = extract_payout_signature(&signed, &depositor)?;

    let signed = signer.sign_psbt(&challenge_psbt).await?;
    let challenge = extract_payout_signature(&signed, &depositor)?;

    log::info!("Signed optimistic and challenge payouts for {}", depositor);
    Ok(PayoutSignatures {
        optimistic,
        challenge,
    })
}
