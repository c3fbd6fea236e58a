//! Deterministic keys and in-process collaborators for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::key::{Keypair, TapTweak, XOnlyPublicKey};
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::{Address, Network, TapLeafHash, Txid};
use pegvault_tx::{decode_psbt, decode_transaction, psbt_to_hex, Utxo};

use crate::error::ServiceError;
use crate::traits::{Broadcaster, PsbtSigner};

/// Keypair for the secret `[0x01, 0x00, ..., 0x00, seed]`.
pub fn test_keypair(seed_byte: u8) -> Keypair {
    let secp = Secp256k1::new();
    let mut bytes = [0u8; 32];
    bytes[0] = 0x01;
    bytes[31] = seed_byte;
    Keypair::from_secret_key(&secp, &SecretKey::from_slice(&bytes).unwrap())
}

pub fn test_xonly(seed_byte: u8) -> XOnlyPublicKey {
    test_keypair(seed_byte).x_only_public_key().0
}

pub fn test_xonly_hex(seed_byte: u8) -> String {
    test_xonly(seed_byte).to_string()
}

/// Key-path P2TR address for the test key.
pub fn regtest_address(seed_byte: u8) -> Address {
    Address::p2tr(
        &Secp256k1::verification_only(),
        test_xonly(seed_byte),
        None,
        Network::Regtest,
    )
}

/// A split output paying to the depositor's key-path address (seed 1).
pub fn split_output(txid_byte: u8, value: u64) -> Utxo {
    Utxo {
        txid: Txid::from_byte_array([txid_byte; 32]),
        vout: 1,
        value: bitcoin::Amount::from_sat(value),
        script_pubkey: regtest_address(1).script_pubkey(),
    }
}

/// Signs every input with a taproot key-path signature from one key.
pub struct KeyPathSigner {
    pub keypair: Keypair,
}

#[async_trait]
impl PsbtSigner for KeyPathSigner {
    async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, ServiceError> {
        let secp = Secp256k1::new();
        let mut psbt = decode_psbt(psbt_hex).map_err(|e| ServiceError::new(e.to_string()))?;
        let prevouts: Vec<_> = psbt
            .inputs
            .iter()
            .map(|i| i.witness_utxo.clone().unwrap())
            .collect();
        let tweaked = self.keypair.tap_tweak(&secp, None).to_inner();

        for index in 0..psbt.inputs.len() {
            let sighash = SighashCache::new(&psbt.unsigned_tx)
                .taproot_key_spend_signature_hash(
                    index,
                    &Prevouts::All(&prevouts),
                    TapSighashType::Default,
                )
                .unwrap();
            let msg = Message::from_digest(sighash.to_byte_array());
            let signature = secp.sign_schnorr_no_aux_rand(&msg, &tweaked);
            psbt.inputs[index].tap_key_sig = Some(bitcoin::taproot::Signature {
                signature,
                sighash_type: TapSighashType::Default,
            });
        }

        Ok(psbt_to_hex(&psbt))
    }
}

/// Signer that always refuses, like a user closing the prompt.
pub struct RejectingSigner;

#[async_trait]
impl PsbtSigner for RejectingSigner {
    async fn sign_psbt(&self, _psbt_hex: &str) -> Result<String, ServiceError> {
        Err(ServiceError::new("User rejected the request"))
    }
}

/// Records pushed transactions and echoes their txid.
#[derive(Default)]
pub struct RecordingBroadcaster {
    pub pushed: Mutex<Vec<String>>,
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn push_tx(&self, tx_hex: &str) -> Result<Txid, ServiceError> {
        let tx = decode_transaction(tx_hex).map_err(|e| ServiceError::new(e.to_string()))?;
        self.pushed.lock().unwrap().push(tx_hex.to_string());
        Ok(tx.compute_txid())
    }
}

/// Signs input 0 through its first tapscript leaf with an untweaked key,
/// checking the signature against the sighash before returning it.
pub struct ScriptPathSigner {
    pub keypair: Keypair,
    pub verified: Mutex<Vec<bitcoin::TapSighash>>,
}

impl ScriptPathSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            verified: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PsbtSigner for ScriptPathSigner {
    async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, ServiceError> {
        let secp = Secp256k1::new();
        let mut psbt = decode_psbt(psbt_hex).map_err(|e| ServiceError::new(e.to_string()))?;
        let prevouts: Vec<_> = psbt
            .inputs
            .iter()
            .map(|i| i.witness_utxo.clone().unwrap())
            .collect();
        let (_, (script, version)) = psbt.inputs[0].tap_scripts.iter().next().unwrap();
        let leaf_hash = TapLeafHash::from_script(script, *version);

        let sighash = SighashCache::new(&psbt.unsigned_tx)
            .taproot_script_spend_signature_hash(
                0,
                &Prevouts::All(&prevouts),
                leaf_hash,
                TapSighashType::Default,
            )
            .unwrap();
        let msg = Message::from_digest(sighash.to_byte_array());
        let signature = secp.sign_schnorr_no_aux_rand(&msg, &self.keypair);
        let pubkey = self.keypair.x_only_public_key().0;
        secp.verify_schnorr(&signature, &msg, &pubkey).unwrap();
        self.verified.lock().unwrap().push(sighash);

        psbt.inputs[0].tap_script_sigs.insert(
            (pubkey, leaf_hash),
            bitcoin::taproot::Signature {
                signature,
                sighash_type: TapSighashType::Default,
            },
        );
        Ok(psbt_to_hex(&psbt))
    }
}
