//! Vault payout connector: the taproot output locking peg-in funds.
//!
//! The peg-in's first output has a single script leaf that both payout
//! variants (optimistic and challenge) spend through:
//!
//! ```text
//! <Depositor>     OP_CHECKSIGVERIFY
//! <VaultProvider> OP_CHECKSIGVERIFY
//! <Keeper_0>      OP_CHECKSIG
//! <Keeper_1>      OP_CHECKSIGADD ... <Keeper_N> OP_CHECKSIGADD
//! <Challenger_0>  OP_CHECKSIGADD ... <Challenger_M> OP_CHECKSIGADD
//! <N+M>           OP_NUMEQUAL
//! ```
//!
//! The internal key is unspendable, so the leaf is the only way to spend.

use bitcoin::key::XOnlyPublicKey;
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_CHECKSIGADD, OP_CHECKSIGVERIFY, OP_NUMEQUAL};
use bitcoin::script::Builder;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::taproot::{ControlBlock, TapLeafHash, TaprootBuilder, TaprootSpendInfo};
use bitcoin::{Address, Network, ScriptBuf};
use serde::Serialize;

use crate::error::ScriptError;
use crate::PAYOUT_LEAF_VERSION;
use crate::unspendable_key;

/// Participants of the vault payout leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutConnector {
    pub depositor: XOnlyPublicKey,
    pub vault_provider: XOnlyPublicKey,
    pub vault_keepers: Vec<XOnlyPublicKey>,
    pub universal_challengers: Vec<XOnlyPublicKey>,
}

/// Everything a caller needs to fund, sign and recognise the vault output.
#[derive(Clone, Debug, Serialize)]
pub struct VaultPayoutScript {
    /// The tapscript leaf
    pub payout_script: ScriptBuf,
    /// Tap leaf hash of `payout_script`
    pub taproot_script_hash: TapLeafHash,
    /// P2TR output script of the vault
    pub script_pubkey: ScriptBuf,
    /// Network-specific P2TR address
    pub address: Address,
    /// Untweaked internal key (unspendable)
    pub internal_key: XOnlyPublicKey,
}

impl PayoutConnector {
    /// Constructs a new connector.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::NoVaultKeepers`] if `vault_keepers` is empty.
    pub fn new(
        depositor: XOnlyPublicKey,
        vault_provider: XOnlyPublicKey,
        vault_keepers: Vec<XOnlyPublicKey>,
        universal_challengers: Vec<XOnlyPublicKey>,
    ) -> Result<Self, ScriptError> {
        if vault_keepers.is_empty() {
            return Err(ScriptError::NoVaultKeepers);
        }

        Ok(Self {
            depositor,
            vault_provider,
            vault_keepers,
            universal_challengers,
        })
    }

    /// Build the payout leaf script.
    pub fn payout_script(&self) -> ScriptBuf {
        let mut builder = Builder::new()
            .push_x_only_key(&self.depositor)
            .push_opcode(OP_CHECKSIGVERIFY)
            .push_x_only_key(&self.vault_provider)
            .push_opcode(OP_CHECKSIGVERIFY);

        let signers = self
            .vault_keepers
            .iter()
            .chain(self.universal_challengers.iter());

        for (i, key) in signers.enumerate() {
            builder = builder.push_x_only_key(key);
            builder = if i == 0 {
                builder.push_opcode(OP_CHECKSIG)
            } else {
                builder.push_opcode(OP_CHECKSIGADD)
            };
        }

        let threshold = (self.vault_keepers.len() + self.universal_challengers.len()) as i64;
        builder
            .push_int(threshold)
            .push_opcode(OP_NUMEQUAL)
            .into_script()
    }

    /// Tap leaf hash of the payout script.
    pub fn taproot_script_hash(&self) -> TapLeafHash {
        TapLeafHash::from_script(&self.payout_script(), PAYOUT_LEAF_VERSION)
    }

    /// Taproot tree with the payout leaf at depth 0 under the unspendable key.
    pub fn taproot_spend_info(&self) -> Result<TaprootSpendInfo, ScriptError> {
        payout_spend_info(self.payout_script(), *unspendable_key())
    }

    /// P2TR address for `network`.
    pub fn address(&self, network: Network) -> Result<Address, ScriptError> {
        let spend_info = self.taproot_spend_info()?;
        Ok(Address::p2tr_tweaked(spend_info.output_key(), network))
    }

    /// Full bundle: script, leaf hash, output script and address.
    pub fn vault_payout_script(&self, network: Network) -> Result<VaultPayoutScript, ScriptError> {
        let payout_script = self.payout_script();
        let taproot_script_hash = TapLeafHash::from_script(&payout_script, PAYOUT_LEAF_VERSION);
        let internal_key = *unspendable_key();
        let spend_info = payout_spend_info(payout_script.clone(), internal_key)?;
        let address = Address::p2tr_tweaked(spend_info.output_key(), network);

        Ok(VaultPayoutScript {
            payout_script,
            taproot_script_hash,
            script_pubkey: address.script_pubkey(),
            address,
            internal_key,
        })
    }
}

/// Build the single-leaf taproot tree for a payout script.
pub fn payout_spend_info(
    payout_script: ScriptBuf,
    internal_key: XOnlyPublicKey,
) -> Result<TaprootSpendInfo, ScriptError> {
    let secp = Secp256k1::verification_only();
    TaprootBuilder::new()
        .add_leaf(0, payout_script)
        .map_err(|e| ScriptError::Taproot(format!("taproot builder error: {}", e)))?
        .finalize(&secp, internal_key)
        .map_err(|_| ScriptError::Taproot("taproot finalize failed".into()))
}

/// Compute the control block proving `payout_script` is committed in the
/// single-leaf tree under `internal_key`.
pub fn payout_control_block(
    payout_script: &ScriptBuf,
    internal_key: XOnlyPublicKey,
) -> Result<ControlBlock, ScriptError> {
    let spend_info = payout_spend_info(payout_script.clone(), internal_key)?;
    spend_info
        .control_block(&(payout_script.clone(), PAYOUT_LEAF_VERSION))
        .ok_or_else(|| ScriptError::Taproot("payout leaf missing from taproot tree".into()))
}

/// Build the vault payout script for a depositor, vault operator and liquidator set.
///
/// Liquidators form the keeper multisig; no universal challengers are added.
pub fn create_vault_payout_script(
    depositor: XOnlyPublicKey,
    vault_provider: XOnlyPublicKey,
    liquidators: &[XOnlyPublicKey],
    network: Network,
) -> Result<VaultPayoutScript, ScriptError> {
    PayoutConnector::new(depositor, vault_provider, liquidators.to_vec(), Vec::new())?
        .vault_payout_script(network)
}
