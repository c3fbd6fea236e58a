//! Command implementations.

use std::str::FromStr;

use anyhow::{Context, Result};
use bitcoin::{OutPoint, Txid};
use pegvault_electrum::{ElectrumClient, ElectrumService};
use pegvault_pegin::{
    fetch_inclusion_proof, peg_in_display_state, prepare_pegin_from_split_output,
    ContractStatus, LocalScriptService, PeginStore, PendingPeginRequest, PreparePeginParams,
};
use pegvault_script::{create_vault_payout_script, parse_xonly, parse_xonly_list, unspendable_key};
use pegvault_tx::{build_payout_psbt_hex, extract_payout_signature, PayoutKind, PayoutPsbtParams};
use serde_json::json;

use crate::config::CliConfig;

fn connect(config: &CliConfig) -> Result<ElectrumClient> {
    let url = config.electrum_url()?;
    ElectrumClient::new(&url)
        .with_context(|| format!("Failed to connect to Electrum at {}", url))
}

fn vault_script(config: &CliConfig) -> Result<pegvault_script::VaultPayoutScript> {
    let vault = create_vault_payout_script(
        parse_xonly(&config.vault.depositor_pubkey)?,
        parse_xonly(&config.vault.vault_provider_pubkey)?,
        &parse_xonly_list(&config.vault.liquidator_pubkeys)?,
        config.network()?,
    )?;
    Ok(vault)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `validate`
pub fn validate(config: &CliConfig) -> Result<()> {
    println!("Configuration is valid.");
    println!("  Network:       {}", config.bitcoin.network);
    println!("  Electrum:      {}", config.electrum_url()?);
    println!("  Fee rate:      {} sat/vB", config.bitcoin.fee_rate);
    println!("  Depositor:     {}", config.vault.depositor_address);
    println!(
        "  Liquidators:   {}",
        config.vault.liquidator_pubkeys.len()
    );
    println!("  Store:         {}", config.store_path().display());
    Ok(())
}

/// `script`
pub fn script(config: &CliConfig) -> Result<()> {
    print_json(&vault_script(config)?)
}

/// `prepare <split_txid:vout> <amount_sat> <change_address>`
pub fn prepare(config: &CliConfig, outpoint: &str, amount: &str, change: &str) -> Result<()> {
    let outpoint = OutPoint::from_str(outpoint)
        .with_context(|| format!("Invalid split output '{}', expected txid:vout", outpoint))?;
    let amount: u64 = amount
        .parse()
        .with_context(|| format!("Invalid amount '{}'", amount))?;

    let client = connect(config)?;
    let split_output = client
        .get_unspent_output(&outpoint)
        .with_context(|| format!("Failed to fetch split output {}", outpoint))?;

    let prepared = prepare_pegin_from_split_output(
        &LocalScriptService,
        &PreparePeginParams {
            depositor_pubkey: config.vault.depositor_pubkey.clone(),
            vault_provider_pubkey: config.vault.vault_provider_pubkey.clone(),
            liquidator_pubkeys: config.vault.liquidator_pubkeys.clone(),
            pegin_amount: amount,
            network: config.bitcoin.network.clone(),
            split_output,
            change_address: change.to_string(),
            fee_rate: config.bitcoin.fee_rate,
        },
    )?;

    let store_path = config.store_path();
    let mut store = PeginStore::load(&store_path)?;
    let mut record = PendingPeginRequest::new(
        prepared.txid.to_string(),
        amount,
        config.vault.depositor_address.clone(),
    );
    record.provider_ids = vec![config.vault.vault_provider_pubkey.clone()];
    store.upsert(record);
    store.save(&store_path)?;
    log::info!("Tracking peg-in {} in {}", prepared.txid, store_path.display());

    print_json(&prepared)
}

/// `payout <optimistic|challenge> <payout_hex> <pegin_hex> <claim_or_assert_hex>`
pub fn payout(
    config: &CliConfig,
    kind: &str,
    payout_hex: &str,
    pegin_hex: &str,
    second_hex: &str,
) -> Result<()> {
    let kind = PayoutKind::from_str(kind)?;
    let vault = vault_script(config)?;
    let psbt = build_payout_psbt_hex(&PayoutPsbtParams {
        kind,
        payout_tx_hex: payout_hex,
        pegin_tx_hex: pegin_hex,
        second_tx_hex: second_hex,
        payout_script: &vault.payout_script,
        internal_key: *unspendable_key(),
    })
    .with_context(|| format!("Failed to build {} payout PSBT", kind))?;
    println!("{}", psbt);
    Ok(())
}

/// `extract-signature <signed_psbt>`
pub fn extract_signature(config: &CliConfig, signed_psbt: &str) -> Result<()> {
    let depositor = parse_xonly(&config.vault.depositor_pubkey)?;
    let signature = extract_payout_signature(signed_psbt, &depositor)
        .context("Failed to extract depositor signature")?;
    println!("{}", signature);
    Ok(())
}

/// `status <pegin_id> <pending|verified|active> [--ready]`
pub fn status(config: &CliConfig, pegin_id: &str, contract: &str, ready: bool) -> Result<()> {
    let contract = ContractStatus::from_str(contract).map_err(anyhow::Error::msg)?;
    let store = PeginStore::load(&config.store_path())?;
    let record = store.get(&config.vault.depositor_address, pegin_id);
    if record.is_none() {
        log::warn!("Peg-in {} is not tracked locally", pegin_id);
    }

    let local = record.map(|r| r.status);
    let display = peg_in_display_state(contract, local, ready);
    print_json(&json!({
        "id": pegin_id,
        "contract_status": contract,
        "local_status": local,
        "btc_tx_hash": record.and_then(|r| r.btc_tx_hash.clone()),
        "display": display,
    }))
}

/// `proof <txid>`
pub fn proof(config: &CliConfig, txid: &str) -> Result<()> {
    let txid = Txid::from_str(txid).with_context(|| format!("Invalid txid '{}'", txid))?;
    let client = connect(config)?;
    let tx = client
        .get_transaction(&txid)
        .with_context(|| format!("Failed to fetch transaction {}", txid))?;
    let script_pubkey = tx
        .output
        .first()
        .map(|o| o.script_pubkey.clone())
        .context("Transaction has no outputs")?;

    let service = ElectrumService::new(client);
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let proof = rt.block_on(fetch_inclusion_proof(&service, &txid, &script_pubkey))?;

    match proof {
        Some(proof) => print_json(&proof),
        None => {
            println!("{} is not confirmed yet", txid);
            Ok(())
        }
    }
}
