//! Peg-in preparation from a split output.
//!
//! The depositor first splits wallet funds so that one output covers the
//! peg-in amount plus fees. That output is the only input the peg-in may
//! spend; nothing else from the wallet is selected.

use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Amount, Txid};
use pegvault_script::{normalize_xonly_hex, parse_network, PegInParams, VaultPayoutScript};
use pegvault_tx::{fund_transaction, select_utxos, validate_fee_rate, Utxo};
use serde::Serialize;

use crate::error::PeginError;
use crate::traits::ScriptService;

const OPERATION: &str = "prepare peg-in from split output";

/// Inputs for [`prepare_pegin_from_split_output`].
#[derive(Debug, Clone)]
pub struct PreparePeginParams {
    pub depositor_pubkey: String,
    pub vault_provider_pubkey: String,
    pub liquidator_pubkeys: Vec<String>,
    pub pegin_amount: u64,
    pub network: String,
    /// The split output funding this peg-in
    pub split_output: Utxo,
    pub change_address: String,
    /// sat/vB
    pub fee_rate: f64,
}

/// A funded, unsigned peg-in ready for signing.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedPegin {
    pub funded_tx_hex: String,
    /// Peg-in identifier
    pub txid: Txid,
    pub vault: VaultPayoutScript,
    pub selected_utxos: Vec<Utxo>,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub fee: Amount,
    /// Change returned to the depositor; zero when folded into the fee
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub change_amount: Amount,
}

/// Build and fund a peg-in spending only `params.split_output`.
pub fn prepare_pegin_from_split_output(
    scripts: &dyn ScriptService,
    params: &PreparePeginParams,
) -> Result<PreparedPegin, PeginError> {
    prepare(scripts, params).map_err(|e| e.during(OPERATION))
}

fn prepare(
    scripts: &dyn ScriptService,
    params: &PreparePeginParams,
) -> Result<PreparedPegin, PeginError> {
    let depositor_pubkey = normalize_xonly_hex(&params.depositor_pubkey)?;
    let vault_provider_pubkey = normalize_xonly_hex(&params.vault_provider_pubkey)?;
    let liquidator_pubkeys = params
        .liquidator_pubkeys
        .iter()
        .map(|k| normalize_xonly_hex(k))
        .collect::<Result<Vec<_>, _>>()?;

    let network = parse_network(&params.network)?;
    validate_fee_rate(params.fee_rate)?;

    let change_address = params
        .change_address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| PeginError::validation(format!("Invalid change address: {}", e)))?
        .require_network(network)
        .map_err(|e| PeginError::validation(format!("Invalid change address: {}", e)))?;

    let unfunded = scripts.create_unfunded_pegin(&PegInParams {
        depositor_pubkey,
        vault_provider_pubkey,
        vault_keeper_pubkeys: liquidator_pubkeys,
        universal_challenger_pubkeys: Vec::new(),
        pegin_amount: params.pegin_amount,
        network: params.network.clone(),
    })?;

    let selection = select_utxos(
        std::slice::from_ref(&params.split_output),
        Amount::from_sat(params.pegin_amount),
        params.fee_rate,
    )?;

    let funded = fund_transaction(
        &unfunded.to_hex(),
        &selection.selected_utxos,
        &change_address,
        selection.change_amount,
    )?;

    let change_amount = match funded.change_index {
        Some(_) => selection.change_amount,
        None => Amount::ZERO,
    };
    let fee = selection.total_value - Amount::from_sat(params.pegin_amount) - change_amount;

    log::info!(
        "Prepared peg-in {}: {} sat to {}, fee {} sat, change {} sat",
        funded.txid(),
        params.pegin_amount,
        unfunded.vault.address,
        fee.to_sat(),
        change_amount.to_sat()
    );

    Ok(PreparedPegin {
        funded_tx_hex: funded.to_hex(),
        txid: funded.txid(),
        vault: unfunded.vault,
        selected_utxos: selection.selected_utxos,
        fee,
        change_amount,
    })
}
