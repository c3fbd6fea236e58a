//! Payout PSBT construction.
//!
//! A payout spends two outputs: the vault output of the peg-in (input 0,
//! spent through the payout leaf) and an output of the claim transaction
//! (optimistic path) or the assert transaction (challenge path) at input 1.
//! The PSBT carries everything a signer needs to compute the taproot
//! script-path sighash, which commits to every prevout of the transaction.

use std::fmt;
use std::str::FromStr;

use bitcoin::key::XOnlyPublicKey;
use bitcoin::psbt::Psbt;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{OutPoint, ScriptBuf, TapLeafHash, Transaction, TxIn, TxOut};
use pegvault_script::PAYOUT_LEAF_VERSION;
use serde::{Deserialize, Serialize};

use crate::error::TxError;
use crate::fund::decode_transaction;
use crate::psbt::psbt_to_hex;

/// Which payout path a transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutKind {
    /// Payout after an unchallenged claim
    Optimistic,
    /// Payout after a challenge resolved through an assert
    Challenge,
}

impl PayoutKind {
    /// Name of the transaction providing the second input.
    pub fn second_input_label(&self) -> &'static str {
        match self {
            PayoutKind::Optimistic => "claim",
            PayoutKind::Challenge => "assert",
        }
    }
}

impl fmt::Display for PayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayoutKind::Optimistic => write!(f, "optimistic"),
            PayoutKind::Challenge => write!(f, "challenge"),
        }
    }
}

impl FromStr for PayoutKind {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optimistic" => Ok(PayoutKind::Optimistic),
            "challenge" => Ok(PayoutKind::Challenge),
            other => Err(TxError::validation(format!(
                "Unknown payout kind '{}': expected optimistic or challenge",
                other
            ))),
        }
    }
}

/// Inputs for building a payout PSBT.
#[derive(Debug, Clone)]
pub struct PayoutPsbtParams<'a> {
    pub kind: PayoutKind,
    pub payout_tx_hex: &'a str,
    pub pegin_tx_hex: &'a str,
    /// Claim tx for [`PayoutKind::Optimistic`], assert tx for [`PayoutKind::Challenge`]
    pub second_tx_hex: &'a str,
    pub payout_script: &'a ScriptBuf,
    pub internal_key: XOnlyPublicKey,
}

/// Build an unsigned payout PSBT.
///
/// The unsigned transaction copies version, locktime, input outpoints and
/// sequences, and outputs from the payout transaction. Input 0 gets its
/// prevout, the payout leaf with control block, and the internal key.
/// Input 1 gets only its prevout.
pub fn build_payout_psbt(params: &PayoutPsbtParams<'_>) -> Result<Psbt, TxError> {
    let payout_tx = decode_transaction(params.payout_tx_hex)?;
    if payout_tx.input.len() != 2 {
        return Err(TxError::validation(format!(
            "Payout transaction must have exactly 2 inputs, got {}",
            payout_tx.input.len()
        )));
    }

    let pegin_tx = decode_transaction(params.pegin_tx_hex)?;
    let second_tx = decode_transaction(params.second_tx_hex)?;

    let pegin_prevout = find_prevout(&pegin_tx, &payout_tx.input[0].previous_output, "pegin")?;
    let second_prevout = find_prevout(
        &second_tx,
        &payout_tx.input[1].previous_output,
        params.kind.second_input_label(),
    )?;

    let control_block =
        pegvault_script::payout_control_block(params.payout_script, params.internal_key)
            .map_err(|e| TxError::validation(e.to_string()))?;

    let expected_spk = ScriptBuf::new_p2tr(
        &Secp256k1::verification_only(),
        params.internal_key,
        Some(TapLeafHash::from_script(params.payout_script, PAYOUT_LEAF_VERSION).into()),
    );
    if pegin_prevout.script_pubkey != expected_spk {
        log::warn!(
            "Peg-in output {} does not pay to the supplied payout script",
            payout_tx.input[0].previous_output
        );
    }

    let unsigned = Transaction {
        version: payout_tx.version,
        lock_time: payout_tx.lock_time,
        input: payout_tx
            .input
            .iter()
            .map(|txin| TxIn {
                previous_output: txin.previous_output,
                sequence: txin.sequence,
                ..Default::default()
            })
            .collect(),
        output: payout_tx.output.clone(),
    };

    let mut psbt = Psbt::from_unsigned_tx(unsigned)
        .map_err(|e| TxError::validation(format!("Failed to create PSBT: {}", e)))?;

    let vault_input = &mut psbt.inputs[0];
    vault_input.witness_utxo = Some(pegin_prevout);
    vault_input.tap_internal_key = Some(params.internal_key);
    vault_input
        .tap_scripts
        .insert(control_block, (params.payout_script.clone(), PAYOUT_LEAF_VERSION));

    psbt.inputs[1].witness_utxo = Some(second_prevout);

    log::debug!(
        "Built {} payout PSBT for {}",
        params.kind,
        psbt.unsigned_tx.compute_txid()
    );

    Ok(psbt)
}

/// [`build_payout_psbt`], hex encoded.
pub fn build_payout_psbt_hex(params: &PayoutPsbtParams<'_>) -> Result<String, TxError> {
    build_payout_psbt(params).map(|psbt| psbt_to_hex(&psbt))
}

fn find_prevout(source: &Transaction, outpoint: &OutPoint, label: &str) -> Result<TxOut, TxError> {
    let txid = source.compute_txid();
    if txid != outpoint.txid {
        return Err(TxError::not_found(format!(
            "Previous output not found: {} is not in {} transaction {}",
            outpoint, label, txid
        )));
    }
    source
        .output
        .get(outpoint.vout as usize)
        .cloned()
        .ok_or_else(|| {
            TxError::not_found(format!(
                "Previous output not found: {} transaction {} has {} outputs, vout {} requested",
                label,
                txid,
                source.output.len(),
                outpoint.vout
            ))
        })
}
