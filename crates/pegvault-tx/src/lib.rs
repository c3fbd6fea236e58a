//! PegVault transaction construction
//!
//! Everything between an unfunded peg-in skeleton and a signable PSBT:
//!
//! - [`select_utxos`] - greedy coin selection against a fee estimate
//! - [`fund_transaction`] - add inputs and change to a peg-in skeleton
//! - [`build_payout_psbt`] - payout PSBT spending the vault through its payout leaf
//! - [`extract_payout_signature`] - depositor signature from a signed payout PSBT

pub mod error;
pub mod fund;
pub mod payout;
pub mod psbt;
pub mod signature;
pub mod utxo;

#[cfg(test)]
mod test_utils;

pub use error::TxError;
pub use fund::{decode_transaction, fund_transaction, FundedTransaction};
pub use payout::{build_payout_psbt, build_payout_psbt_hex, PayoutKind, PayoutPsbtParams};
pub use psbt::{decode_psbt, psbt_to_hex};
pub use signature::extract_payout_signature;
pub use utxo::{
    estimate_fee, estimate_vbytes, select_utxos, validate_fee_rate, Utxo, UtxoSelection,
    DUST_LIMIT, MAX_FEE_RATE,
};
