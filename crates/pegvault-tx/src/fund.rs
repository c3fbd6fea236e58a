//! Peg-in funding: turn an unfunded skeleton into a complete unsigned transaction.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::deserialize_partial;
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use crate::error::TxError;
use crate::utxo::{Utxo, DUST_LIMIT};

/// A funded, unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundedTransaction {
    pub tx: Transaction,
    /// Index of the change output, if one was created
    pub change_index: Option<usize>,
}

impl FundedTransaction {
    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(bitcoin::consensus::serialize(&self.tx))
    }
}

/// Decode a transaction from hex.
///
/// Zero-input skeletons are accepted in both BIP-144 serialization (what
/// rust-bitcoin emits) and legacy serialization (what some JS wallets emit),
/// where the empty input vector is otherwise mistaken for a segwit marker.
pub fn decode_transaction(tx_hex: &str) -> Result<Transaction, TxError> {
    let bytes = hex::decode(tx_hex.trim())
        .map_err(|e| TxError::validation(format!("Invalid transaction hex: {}", e)))?;

    match bitcoin::consensus::deserialize::<Transaction>(&bytes) {
        Ok(tx) => Ok(tx),
        Err(e) => decode_legacy_zero_input(&bytes)
            .ok_or_else(|| TxError::validation(format!("Invalid transaction: {}", e))),
    }
}

fn decode_legacy_zero_input(bytes: &[u8]) -> Option<Transaction> {
    let (version, mut pos) = deserialize_partial::<Version>(bytes).ok()?;
    let (input, n) = deserialize_partial::<Vec<TxIn>>(&bytes[pos..]).ok()?;
    pos += n;
    let (output, n) = deserialize_partial::<Vec<TxOut>>(&bytes[pos..]).ok()?;
    pos += n;
    let (lock_time, n) = deserialize_partial::<LockTime>(&bytes[pos..]).ok()?;
    pos += n;

    if pos != bytes.len() || !input.is_empty() {
        return None;
    }

    Some(Transaction {
        version,
        lock_time,
        input,
        output,
    })
}

/// Append one input per selected UTXO and, when worth creating, a change output.
///
/// Existing outputs, version and locktime are preserved. Change below
/// [`DUST_LIMIT`] is left to the miner rather than creating a dust output.
pub fn fund_transaction(
    unfunded_tx_hex: &str,
    selected: &[Utxo],
    change_address: &Address,
    change_amount: Amount,
) -> Result<FundedTransaction, TxError> {
    if selected.is_empty() {
        return Err(TxError::validation("No UTXOs selected for funding"));
    }

    let mut tx = decode_transaction(unfunded_tx_hex)?;
    if tx.output.is_empty() {
        return Err(TxError::validation(
            "Unfunded transaction has no outputs to fund",
        ));
    }

    for utxo in selected {
        if tx.input.iter().any(|i| i.previous_output == utxo.outpoint()) {
            return Err(TxError::validation(format!(
                "UTXO {} is already spent by the transaction",
                utxo.outpoint()
            )));
        }
        tx.input.push(TxIn {
            previous_output: utxo.outpoint(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        });
    }

    let change_index = if change_amount >= DUST_LIMIT {
        tx.output.push(TxOut {
            value: change_amount,
            script_pubkey: change_address.script_pubkey(),
        });
        Some(tx.output.len() - 1)
    } else {
        if change_amount > Amount::ZERO {
            log::debug!(
                "Change of {} sat is below dust, adding it to the fee",
                change_amount.to_sat()
            );
        }
        None
    };

    Ok(FundedTransaction { tx, change_index })
}
