//! UTXO selection and fee estimation for peg-in funding.
//!
//! Inputs are assumed to be taproot key-path spends. The estimate always
//! budgets two outputs (vault + change); whether the change output is
//! actually created is decided by the funder.

use std::str::FromStr;

use bitcoin::{Amount, OutPoint, ScriptBuf, TxOut, Txid};
use serde::{Deserialize, Serialize};

use crate::error::TxError;

/// Taproot key-path input: 57.5 vbytes (outpoint, sequence, 64-byte Schnorr witness).
pub const TAPROOT_INPUT_VSIZE: f64 = 57.5;

/// P2TR output: 43 vbytes.
pub const P2TR_OUTPUT_VSIZE: f64 = 43.0;

/// Version, locktime, segwit marker/flag and counts.
pub const TX_OVERHEAD_VSIZE: f64 = 10.5;

/// Outputs below this value are not relayed; change under it is folded into the fee.
pub const DUST_LIMIT: Amount = Amount::from_sat(546);

/// Maximum fee rate we'll accept (sat/vB). Protects against malicious fee data.
pub const MAX_FEE_RATE: f64 = 500.0;

/// A spendable output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub value: Amount,
    pub script_pubkey: ScriptBuf,
}

impl Utxo {
    /// Build from the hex/integer shape wallets and indexers report.
    pub fn from_parts(
        txid: &str,
        vout: u32,
        value_sat: u64,
        script_pubkey_hex: &str,
    ) -> Result<Self, TxError> {
        if txid.len() != 64 {
            return Err(TxError::validation(format!(
                "UTXO txid must be 64 hex characters, got {}",
                txid.len()
            )));
        }
        let txid = Txid::from_str(txid)
            .map_err(|e| TxError::validation(format!("Invalid UTXO txid {}: {}", txid, e)))?;
        let script_bytes = hex::decode(script_pubkey_hex).map_err(|e| {
            TxError::validation(format!("Invalid UTXO scriptPubKey hex: {}", e))
        })?;

        Ok(Self {
            txid,
            vout,
            value: Amount::from_sat(value_sat),
            script_pubkey: ScriptBuf::from_bytes(script_bytes),
        })
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid,
            vout: self.vout,
        }
    }

    pub fn txout(&self) -> TxOut {
        TxOut {
            value: self.value,
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

/// Result of selecting UTXOs for a target value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtxoSelection {
    pub selected_utxos: Vec<Utxo>,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub total_value: Amount,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub fee: Amount,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub change_amount: Amount,
}

/// Reject fee rates that are non-finite, non-positive or above [`MAX_FEE_RATE`].
pub fn validate_fee_rate(fee_rate: f64) -> Result<(), TxError> {
    if !fee_rate.is_finite() || fee_rate <= 0.0 || fee_rate > MAX_FEE_RATE {
        return Err(TxError::validation(format!(
            "Fee rate {} sat/vB must be > 0 and <= {} sat/vB",
            fee_rate, MAX_FEE_RATE
        )));
    }
    Ok(())
}

/// Estimate virtual size for `num_inputs` taproot inputs and `num_outputs` P2TR outputs.
pub fn estimate_vbytes(num_inputs: usize, num_outputs: usize) -> f64 {
    TAPROOT_INPUT_VSIZE * num_inputs as f64
        + P2TR_OUTPUT_VSIZE * num_outputs as f64
        + TX_OVERHEAD_VSIZE
}

/// Fee for a funding transaction with `num_inputs` inputs and two outputs.
pub fn estimate_fee(num_inputs: usize, fee_rate: f64) -> Amount {
    let vbytes = estimate_vbytes(num_inputs, 2);
    Amount::from_sat((vbytes * fee_rate).ceil() as u64)
}

/// Accumulate UTXOs in pool order until they cover `target` plus the fee for
/// the inputs selected so far.
///
/// The pool is consumed in the order given; callers wanting a particular
/// strategy (e.g. largest-first) sort before calling.
pub fn select_utxos(
    pool: &[Utxo],
    target: Amount,
    fee_rate: f64,
) -> Result<UtxoSelection, TxError> {
    validate_fee_rate(fee_rate)?;
    if target == Amount::ZERO {
        return Err(TxError::validation("Target amount must be greater than zero"));
    }
    if target > Amount::MAX_MONEY {
        return Err(TxError::validation(format!(
            "Target amount {} sat exceeds the maximum money supply",
            target.to_sat()
        )));
    }

    let mut selected = Vec::new();
    let mut total = Amount::ZERO;

    for utxo in pool {
        selected.push(utxo.clone());
        total = checked_sum(total, utxo.value)?;

        let fee = estimate_fee(selected.len(), fee_rate);
        let needed = checked_sum(target, fee)?;
        if total >= needed {
            log::debug!(
                "Selected {} UTXO(s): total {} sat, fee {} sat",
                selected.len(),
                total.to_sat(),
                fee.to_sat()
            );
            return Ok(UtxoSelection {
                selected_utxos: selected,
                total_value: total,
                fee,
                change_amount: total - needed,
            });
        }
    }

    let needed = checked_sum(target, estimate_fee(pool.len().max(1), fee_rate))?;
    Err(TxError::InsufficientFunds {
        needed: needed.to_sat(),
        available: total.to_sat(),
    })
}

fn checked_sum(a: Amount, b: Amount) -> Result<Amount, TxError> {
    a.checked_add(b)
        .ok_or_else(|| TxError::validation("Amount overflow while selecting UTXOs"))
}
