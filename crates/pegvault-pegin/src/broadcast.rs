//! Sign and broadcast a funded peg-in.

use bitcoin::key::XOnlyPublicKey;
use bitcoin::psbt::Psbt;
use bitcoin::{Transaction, TxIn, Txid, Witness};
use pegvault_script::parse_xonly;
use pegvault_tx::{decode_psbt, decode_transaction, psbt_to_hex, Utxo};

use crate::error::PeginError;
use crate::traits::{Broadcaster, PsbtSigner};

const OPERATION: &str = "broadcast peg-in";

/// How many candidate ids to list when an input has no local match.
const MAX_LISTED_CANDIDATES: usize = 5;

/// Inputs for [`broadcast_pegin_with_local_utxo`].
#[derive(Debug, Clone)]
pub struct BroadcastPeginParams<'a> {
    pub funded_tx_hex: &'a str,
    /// Split outputs the funded transaction may spend
    pub candidates: &'a [Utxo],
    /// Key-path key of the split outputs
    pub depositor_pubkey: &'a str,
}

/// Sign the funded peg-in with the depositor's wallet and broadcast it.
///
/// Returns the txid reported by the broadcaster, which must equal the txid
/// of the funded transaction.
pub async fn broadcast_pegin_with_local_utxo(
    signer: &dyn PsbtSigner,
    broadcaster: &dyn Broadcaster,
    params: &BroadcastPeginParams<'_>,
) -> Result<Txid, PeginError> {
    broadcast(signer, broadcaster, params)
        .await
        .map_err(|e| e.during(OPERATION))
}

async fn broadcast(
    signer: &dyn PsbtSigner,
    broadcaster: &dyn Broadcaster,
    params: &BroadcastPeginParams<'_>,
) -> Result<Txid, PeginError> {
    let funded = decode_transaction(params.funded_tx_hex)?;
    if funded.input.is_empty() {
        return Err(PeginError::validation("Funded transaction has no inputs"));
    }
    let internal_key = parse_xonly(params.depositor_pubkey)?;
    let expected_txid = funded.compute_txid();

    let psbt = build_signing_psbt(&funded, params.candidates, internal_key)?;

    let signed_hex = signer.sign_psbt(&psbt_to_hex(&psbt)).await?;
    let mut signed = decode_psbt(&signed_hex)?;
    finalize_key_path(&mut signed)?;

    let final_tx = signed
        .extract_tx()
        .map_err(|e| PeginError::validation(format!("Failed to extract transaction: {}", e)))?;

    let signed_txid = final_tx.compute_txid();
    if signed_txid != expected_txid {
        return Err(PeginError::Mismatch {
            expected: expected_txid.to_string(),
            actual: signed_txid.to_string(),
        });
    }

    let tx_hex = hex::encode(bitcoin::consensus::serialize(&final_tx));
    let broadcast_txid = broadcaster.push_tx(&tx_hex).await?;
    if broadcast_txid != expected_txid {
        return Err(PeginError::Mismatch {
            expected: expected_txid.to_string(),
            actual: broadcast_txid.to_string(),
        });
    }

    log::info!("Broadcast peg-in {}", broadcast_txid);
    Ok(broadcast_txid)
}

/// PSBT mirroring `funded`, with prevout and internal key for every input.
fn build_signing_psbt(
    funded: &Transaction,
    candidates: &[Utxo],
    internal_key: XOnlyPublicKey,
) -> Result<Psbt, PeginError> {
    let unsigned = Transaction {
        version: funded.version,
        lock_time: funded.lock_time,
        input: funded
            .input
            .iter()
            .map(|txin| TxIn {
                previous_output: txin.previous_output,
                sequence: txin.sequence,
                ..Default::default()
            })
            .collect(),
        output: funded.output.clone(),
    };

    let mut psbt = Psbt::from_unsigned_tx(unsigned)
        .map_err(|e| PeginError::validation(format!("Failed to create PSBT: {}", e)))?;

    for (index, txin) in funded.input.iter().enumerate() {
        // Txid compares in internal byte order; Display gives the reversed
        // form wallets and explorers report.
        let outpoint = txin.previous_output;
        let utxo = candidates
            .iter()
            .find(|u| u.txid == outpoint.txid && u.vout == outpoint.vout)
            .ok_or_else(|| {
                PeginError::not_found(format!(
                    "No local UTXO for input {} ({}:{}); available: {}",
                    index,
                    outpoint.txid,
                    outpoint.vout,
                    describe_candidates(candidates)
                ))
            })?;

        psbt.inputs[index].witness_utxo = Some(utxo.txout());
        psbt.inputs[index].tap_internal_key = Some(internal_key);
    }

    Ok(psbt)
}

fn describe_candidates(candidates: &[Utxo]) -> String {
    if candidates.is_empty() {
        return "none".to_string();
    }
    let mut listed: Vec<String> = candidates
        .iter()
        .take(MAX_LISTED_CANDIDATES)
        .map(|u| {
            let txid = u.txid.to_string();
            format!("{}...:{}", &txid[..8], u.vout)
        })
        .collect();
    if candidates.len() > MAX_LISTED_CANDIDATES {
        listed.push(format!(
            "and {} more",
            candidates.len() - MAX_LISTED_CANDIDATES
        ));
    }
    listed.join(", ")
}

/// Move key-path signatures into final witnesses.
///
/// Inputs the signer already finalized are left as they are.
fn finalize_key_path(psbt: &mut Psbt) -> Result<(), PeginError> {
    for (index, input) in psbt.inputs.iter_mut().enumerate() {
        if input.final_script_witness.is_some() {
            continue;
        }
        let sig = input.tap_key_sig.ok_or_else(|| {
            PeginError::validation(format!("Input {} was not signed", index))
        })?;
        input.final_script_witness = Some(Witness::p2tr_key_spend(&sig));
        input.tap_key_sig = None;
        input.tap_internal_key = None;
    }
    Ok(())
}
