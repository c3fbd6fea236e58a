//! PegVault script construction
//!
//! Builds the taproot payout script that locks a depositor's peg-in output,
//! and the unfunded peg-in transaction paying to it.
//!
//! - [`PayoutConnector`] - the vault payout leaf and its taproot output
//! - [`create_vault_payout_script`] - script, leaf hash, scriptPubKey and address
//! - [`new_unfunded_pegin_tx`] - zero-input peg-in skeleton for funding

pub mod connector;
pub mod error;
pub mod keys;
pub mod pegin;

#[cfg(test)]
mod test_utils;

pub use connector::{
    create_vault_payout_script, payout_control_block, payout_spend_info, PayoutConnector,
    VaultPayoutScript,
};
pub use error::ScriptError;
pub use keys::{normalize_xonly_hex, parse_network, parse_xonly, parse_xonly_list};
pub use pegin::{new_unfunded_pegin_tx, PegInParams, UnfundedPegin};

use bitcoin::key::XOnlyPublicKey;
use bitcoin::taproot::LeafVersion;
use std::str::FromStr;
use std::sync::LazyLock;

/// Unspendable (NUMS) public key used as the taproot internal key of the vault output
pub const UNSPENDABLE_PUBKEY_STR: &str =
    "50929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0";

static UNSPENDABLE_PUBKEY: LazyLock<XOnlyPublicKey> = LazyLock::new(|| {
    XOnlyPublicKey::from_str(UNSPENDABLE_PUBKEY_STR).expect("static key must parse")
});

/// The unspendable internal key.
pub fn unspendable_key() -> &'static XOnlyPublicKey {
    &UNSPENDABLE_PUBKEY
}

/// Tapscript leaf version used for the payout leaf (`0xc0`).
pub const PAYOUT_LEAF_VERSION: LeafVersion = LeafVersion::TapScript;
