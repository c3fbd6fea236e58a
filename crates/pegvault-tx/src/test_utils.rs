//! Shared fixtures for payout tests.

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::key::XOnlyPublicKey;
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::transaction::Version;
use bitcoin::{Amount, Network, OutPoint, ScriptBuf, Transaction, TxIn, TxOut, Txid};
use pegvault_script::{create_vault_payout_script, VaultPayoutScript};

/// X-only key for the secret `[0x02, 0x00, ..., 0x00, seed]`.
pub fn test_xonly(seed_byte: u8) -> XOnlyPublicKey {
    let secp = Secp256k1::new();
    let mut bytes = [0u8; 32];
    bytes[0] = 0x02;
    bytes[31] = seed_byte;
    SecretKey::from_slice(&bytes)
        .unwrap()
        .x_only_public_key(&secp)
        .0
}

pub fn test_vault() -> VaultPayoutScript {
    create_vault_payout_script(
        test_xonly(1),
        test_xonly(2),
        &[test_xonly(3), test_xonly(4)],
        Network::Regtest,
    )
    .unwrap()
}

/// A confirmed-looking transaction with a single output.
pub fn single_output_tx(seed: u8, value: u64, script_pubkey: ScriptBuf) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: Txid::from_byte_array([seed; 32]),
                vout: 0,
            },
            ..Default::default()
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey,
        }],
    }
}

/// Payout spending `inputs` with one output of `value`.
pub fn payout_tx(inputs: &[OutPoint], value: u64) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|op| TxIn {
                previous_output: *op,
                ..Default::default()
            })
            .collect(),
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey: ScriptBuf::new_p2tr(
                &Secp256k1::verification_only(),
                test_xonly(1),
                None,
            ),
        }],
    }
}

pub fn to_hex(tx: &Transaction) -> String {
    hex::encode(bitcoin::consensus::serialize(tx))
}
