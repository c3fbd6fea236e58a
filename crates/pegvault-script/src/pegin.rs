//! Unfunded peg-in transaction.
//!
//! The skeleton has no inputs and a single output paying the vault. A wallet
//! (or the transaction funder) adds inputs and change afterwards.

use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, Transaction, TxOut};

use crate::connector::{PayoutConnector, VaultPayoutScript};
use crate::error::ScriptError;
use crate::keys::{parse_network, parse_xonly, parse_xonly_list};

/// Parameters for creating a peg-in from string-based inputs.
#[derive(Debug, Clone)]
pub struct PegInParams {
    pub depositor_pubkey: String,
    pub vault_provider_pubkey: String,
    pub vault_keeper_pubkeys: Vec<String>,
    pub universal_challenger_pubkeys: Vec<String>,
    pub pegin_amount: u64,
    pub network: String,
}

/// An unfunded peg-in and the vault script it pays to.
#[derive(Debug, Clone)]
pub struct UnfundedPegin {
    pub tx: Transaction,
    pub vault: VaultPayoutScript,
}

impl UnfundedPegin {
    /// Consensus-serialized transaction hex.
    pub fn to_hex(&self) -> String {
        hex::encode(bitcoin::consensus::serialize(&self.tx))
    }

    /// Vault output value in satoshis.
    pub fn vault_value(&self) -> u64 {
        self.tx.output[0].value.to_sat()
    }
}

/// Create an unfunded peg-in transaction.
///
/// Version 2, locktime 0, no inputs, one output of `pegin_amount` to the
/// vault's P2TR address.
pub fn new_unfunded_pegin_tx(params: &PegInParams) -> Result<UnfundedPegin, ScriptError> {
    if params.pegin_amount == 0 {
        return Err(ScriptError::ZeroAmount);
    }

    let network = parse_network(&params.network)?;
    let depositor = parse_xonly(&params.depositor_pubkey)?;
    let vault_provider = parse_xonly(&params.vault_provider_pubkey)?;
    let vault_keepers = parse_xonly_list(&params.vault_keeper_pubkeys)?;
    let universal_challengers = parse_xonly_list(&params.universal_challenger_pubkeys)?;

    let connector =
        PayoutConnector::new(depositor, vault_provider, vault_keepers, universal_challengers)?;
    let vault = connector.vault_payout_script(network)?;

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![],
        output: vec![TxOut {
            value: Amount::from_sat(params.pegin_amount),
            script_pubkey: vault.script_pubkey.clone(),
        }],
    };

    Ok(UnfundedPegin { tx, vault })
}
