//! Depositor signature extraction from a signed payout PSBT.

use bitcoin::key::XOnlyPublicKey;
use bitcoin::psbt::{Error as PsbtError, Psbt};

use crate::error::TxError;
use crate::psbt::decode_psbt_bytes;

/// Pull the depositor's Schnorr signature for input 0 out of a signed PSBT.
///
/// Returns 128 hex characters. A trailing sighash byte is dropped so the
/// result is always the bare 64-byte signature. Signatures of any other
/// length, or with an unknown sighash byte, fail while the PSBT is decoded
/// and are reported as malformed.
pub fn extract_payout_signature(
    signed_psbt: &str,
    depositor_pubkey: &XOnlyPublicKey,
) -> Result<String, TxError> {
    let psbt = Psbt::deserialize(&decode_psbt_bytes(signed_psbt)?).map_err(|e| match e {
        PsbtError::InvalidTaprootSignature(e) => {
            TxError::validation(format!("Malformed signature in signed PSBT: {}", e))
        }
        PsbtError::NonStandardSighashType(t) => TxError::validation(format!(
            "Malformed signature in signed PSBT: non-standard sighash type {:#x}",
            t
        )),
        e => TxError::validation(format!("Invalid PSBT: {}", e)),
    })?;

    let input = psbt
        .inputs
        .first()
        .ok_or_else(|| TxError::validation("No inputs found in signed PSBT"))?;

    if input.tap_script_sigs.is_empty() {
        return Err(TxError::validation("No tapScriptSig found in signed PSBT"));
    }

    let signature = input
        .tap_script_sigs
        .iter()
        .find(|((pubkey, _), _)| pubkey == depositor_pubkey)
        .map(|(_, sig)| sig)
        .ok_or_else(|| {
            TxError::validation(format!(
                "No signature found for depositor pubkey {}",
                depositor_pubkey
            ))
        })?;

    Ok(hex::encode(signature.signature.serialize()))
}
