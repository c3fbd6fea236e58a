//! End-to-end peg-in lifecycle.
//!
//! 1. Prepare and fund a peg-in from a split output
//! 2. Register it with a contract and track it locally
//! 3. Pre-sign both payout paths once the provider publishes them
//! 4. Sign and broadcast the peg-in after verification
//! 5. Fetch its inclusion proof and watch the vault go live
//!
//! The broadcast peg-in and a fully signed payout both pass Bitcoin Core
//! consensus verification.

use std::sync::Mutex;

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash as _;
use bitcoin::key::TapTweak;
use bitcoin::secp256k1::{Keypair, Message, Secp256k1, SecretKey};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot::{LeafVersion, Signature as TapSignature, TapLeafHash};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, Network, OutPoint, Script, ScriptBuf, Transaction, TxIn, TxOut, Txid,
    Witness,
};

use pegvault_pegin::{
    broadcast_pegin_with_local_utxo, fetch_inclusion_proof, peg_in_display_state,
    prepare_pegin_from_split_output, register_split_pegin_on_chain, sign_payout_transactions,
    BroadcastPeginParams, Broadcaster, ChainQuery, ContractStatus, InclusionProof,
    LocalScriptService, LocalStorageStatus, PayoutSigningParams, PeginAction, PeginStore,
    PendingPeginRequest, PreparePeginParams, PsbtSigner, RegistrationClient, RegistrationRequest,
    RegistrationResult, ServiceError,
};
use pegvault_script::{payout_control_block, unspendable_key};
use pegvault_tx::{decode_psbt, decode_transaction, psbt_to_hex, Utxo};

const PEGIN_AMOUNT: u64 = 5_000_000;

fn test_keypair(seed: u8) -> Keypair {
    let secp = Secp256k1::new();
    let mut bytes = [0u8; 32];
    bytes[31] = seed;
    bytes[0] = 0x01;
    Keypair::from_secret_key(&secp, &SecretKey::from_slice(&bytes).unwrap())
}

fn xonly_hex(seed: u8) -> String {
    test_keypair(seed).x_only_public_key().0.to_string()
}

fn wallet_address(seed: u8) -> Address {
    let secp = Secp256k1::verification_only();
    Address::p2tr(
        &secp,
        test_keypair(seed).x_only_public_key().0,
        None,
        Network::Regtest,
    )
}

/// Consensus-verify one input of a transaction.
fn consensus_verify(tx: &Transaction, spent_outputs: &[TxOut], input_index: usize) {
    let tx_bytes = bitcoin::consensus::serialize(tx);
    let txout = &spent_outputs[input_index];

    let all_utxos: Vec<bitcoinconsensus::Utxo> = spent_outputs
        .iter()
        .map(|o| {
            let sb = o.script_pubkey.as_bytes();
            bitcoinconsensus::Utxo {
                script_pubkey: sb.as_ptr(),
                script_pubkey_len: sb.len() as u32,
                value: o.value.to_sat() as i64,
            }
        })
        .collect();

    let result = bitcoinconsensus::verify(
        txout.script_pubkey.as_bytes(),
        txout.value.to_sat(),
        &tx_bytes,
        Some(&all_utxos),
        input_index,
    );

    assert!(
        result.is_ok(),
        "consensus verification failed for input {}: {:?}",
        input_index,
        result.err()
    );
}

/// Depositor wallet: key-path signs every input with a tweaked key, and
/// script-path signs input 0 of payout PSBTs with the untweaked key.
struct DepositorWallet {
    keypair: Keypair,
}

#[async_trait]
impl PsbtSigner for DepositorWallet {
    async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, ServiceError> {
        let secp = Secp256k1::new();
        let mut psbt = decode_psbt(psbt_hex).map_err(|e| ServiceError::new(e.to_string()))?;
        let prevouts: Vec<TxOut> = psbt
            .inputs
            .iter()
            .map(|i| i.witness_utxo.clone().unwrap())
            .collect();

        let leaf = psbt.inputs[0]
            .tap_scripts
            .values()
            .next()
            .map(|(script, ver)| TapLeafHash::from_script(script, *ver));

        match leaf {
            Some(leaf_hash) => {
                let sighash = SighashCache::new(&psbt.unsigned_tx)
                    .taproot_script_spend_signature_hash(
                        0,
                        &Prevouts::All(&prevouts),
                        leaf_hash,
                        TapSighashType::Default,
                    )
                    .unwrap();
                let msg = Message::from_digest(sighash.to_byte_array());
                // Some wallets append a sighash byte to default-sighash
                // signatures; the extractor must strip it.
                psbt.inputs[0].tap_script_sigs.insert(
                    (self.keypair.x_only_public_key().0, leaf_hash),
                    TapSignature {
                        signature: secp.sign_schnorr_no_aux_rand(&msg, &self.keypair),
                        sighash_type: TapSighashType::All,
                    },
                );
            }
            None => {
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
                    psbt.inputs[index].tap_key_sig = Some(TapSignature {
                        signature: secp.sign_schnorr_no_aux_rand(&msg, &tweaked),
                        sighash_type: TapSighashType::Default,
                    });
                }
            }
        }

        Ok(psbt_to_hex(&psbt))
    }
}

#[derive(Default)]
struct MemPool {
    txs: Mutex<Vec<Transaction>>,
}

#[async_trait]
impl Broadcaster for MemPool {
    async fn push_tx(&self, tx_hex: &str) -> Result<Txid, ServiceError> {
        let tx = decode_transaction(tx_hex).map_err(|e| ServiceError::new(e.to_string()))?;
        let txid = tx.compute_txid();
        self.txs.lock().unwrap().push(tx);
        Ok(txid)
    }
}

#[async_trait]
impl ChainQuery for MemPool {
    async fn inclusion_proof(
        &self,
        txid: &Txid,
        _script_pubkey: &Script,
    ) -> Result<Option<InclusionProof>, ServiceError> {
        let known = self
            .txs
            .lock()
            .unwrap()
            .iter()
            .any(|tx| tx.compute_txid() == *txid);
        Ok(known.then(|| InclusionProof {
            pos: 1,
            merkle: vec![txid.to_string()],
            block_hash: "00".repeat(32),
        }))
    }
}

struct Contract;

#[async_trait]
impl RegistrationClient for Contract {
    async fn register_pegin(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResult, ServiceError> {
        let tx = decode_transaction(&request.unsigned_btc_tx)
            .map_err(|e| ServiceError::new(e.to_string()))?;
        Ok(RegistrationResult {
            eth_tx_hash: format!("0x{}", "ee".repeat(32)),
            vault_id: tx.compute_txid().to_string(),
        })
    }
}

fn spend(inputs: &[OutPoint], outputs: Vec<TxOut>) -> Transaction {
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
        output: outputs,
    }
}

fn hex_of(tx: &Transaction) -> String {
    hex::encode(bitcoin::consensus::serialize(tx))
}

#[tokio::test]
async fn test_full_pegin_lifecycle() {
    let secp = Secp256k1::new();
    let depositor = test_keypair(1);
    let provider = test_keypair(2);
    let keeper = test_keypair(3);
    let depositor_address = wallet_address(1);
    let wallet = DepositorWallet { keypair: depositor };
    let mempool = MemPool::default();

    // Split output in the depositor's wallet
    let split = Utxo {
        txid: Txid::from_byte_array([0xAA; 32]),
        vout: 0,
        value: Amount::from_sat(PEGIN_AMOUNT + 50_000),
        script_pubkey: depositor_address.script_pubkey(),
    };

    // ═══════════════════════════════════════════════════════════════════════
    // STEP 1: Prepare
    // ═══════════════════════════════════════════════════════════════════════
    let prepared = prepare_pegin_from_split_output(
        &LocalScriptService,
        &PreparePeginParams {
            depositor_pubkey: xonly_hex(1),
            vault_provider_pubkey: xonly_hex(2),
            liquidator_pubkeys: vec![xonly_hex(3)],
            pegin_amount: PEGIN_AMOUNT,
            network: "regtest".into(),
            split_output: split.clone(),
            change_address: depositor_address.to_string(),
            fee_rate: 5.0,
        },
    )
    .unwrap();
    let pegin_id = prepared.txid.to_string();

    // ═══════════════════════════════════════════════════════════════════════
    // STEP 2: Register and track
    // ═══════════════════════════════════════════════════════════════════════
    let registration = register_split_pegin_on_chain(
        &Contract,
        RegistrationRequest {
            depositor_btc_pubkey: xonly_hex(1),
            unsigned_btc_tx: prepared.funded_tx_hex.clone(),
            vault_provider: "provider-1".into(),
            on_pop_signed: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(registration.vault_id, pegin_id);

    let owner = depositor_address.to_string();
    let mut store = PeginStore::new();
    let mut record = PendingPeginRequest::new(&pegin_id, PEGIN_AMOUNT, &owner);
    record.provider_ids = vec!["provider-1".into()];
    store.upsert(record);

    let local = Some(store.get(&owner, &pegin_id).unwrap().status);
    assert_eq!(
        peg_in_display_state(ContractStatus::Pending, local, false).next_action,
        None
    );
    assert_eq!(
        peg_in_display_state(ContractStatus::Pending, local, true).next_action,
        Some(PeginAction::SignPayoutTransactions)
    );

    // ═══════════════════════════════════════════════════════════════════════
    // STEP 3: Pre-sign payouts
    // ═══════════════════════════════════════════════════════════════════════
    let pegin_tx = decode_transaction(&prepared.funded_tx_hex).unwrap();
    let vault_out = OutPoint::new(prepared.txid, 0);
    let recipient = depositor_address.script_pubkey();

    let claim = spend(
        &[OutPoint::new(Txid::from_byte_array([0xC1; 32]), 0)],
        vec![TxOut {
            value: Amount::from_sat(30_000),
            script_pubkey: ScriptBuf::new(),
        }],
    );
    let assert_tx = spend(
        &[OutPoint::new(Txid::from_byte_array([0xC2; 32]), 0)],
        vec![TxOut {
            value: Amount::from_sat(40_000),
            script_pubkey: ScriptBuf::new(),
        }],
    );
    let optimistic = spend(
        &[vault_out, OutPoint::new(claim.compute_txid(), 0)],
        vec![TxOut {
            value: Amount::from_sat(PEGIN_AMOUNT + 30_000 - 5_000),
            script_pubkey: recipient.clone(),
        }],
    );
    let challenge = spend(
        &[vault_out, OutPoint::new(assert_tx.compute_txid(), 0)],
        vec![TxOut {
            value: Amount::from_sat(PEGIN_AMOUNT + 40_000 - 5_000),
            script_pubkey: recipient,
        }],
    );

    let depositor_hex = xonly_hex(1);
    let script_hex = hex::encode(prepared.vault.payout_script.as_bytes());
    let (optimistic_hex, claim_hex) = (hex_of(&optimistic), hex_of(&claim));
    let (challenge_hex, assert_hex) = (hex_of(&challenge), hex_of(&assert_tx));
    let signing = PayoutSigningParams {
        depositor_pubkey: &depositor_hex,
        payout_script_hex: &script_hex,
        pegin_tx_hex: &prepared.funded_tx_hex,
        optimistic_payout_tx_hex: &optimistic_hex,
        claim_tx_hex: &claim_hex,
        challenge_payout_tx_hex: &challenge_hex,
        assert_tx_hex: &assert_hex,
    };
    let signatures = sign_payout_transactions(&wallet, &signing).await.unwrap();
    assert_eq!(signatures.optimistic.len(), 128);

    let first = store
        .apply_action(&owner, &pegin_id, PeginAction::SignPayoutTransactions, None)
        .unwrap();
    // A retried signing round is harmless
    let second = store
        .apply_action(&owner, &pegin_id, PeginAction::SignPayoutTransactions, None)
        .unwrap();
    assert_eq!(first, LocalStorageStatus::PayoutSigned);
    assert_eq!(first, second);

    // The depositor signature completes a valid payout once the provider and
    // keeper add theirs.
    let prevouts = vec![pegin_tx.output[0].clone(), claim.output[0].clone()];
    let leaf_hash = TapLeafHash::from_script(&prepared.vault.payout_script, LeafVersion::TapScript);
    let sighash = SighashCache::new(&optimistic)
        .taproot_script_spend_signature_hash(
            0,
            &Prevouts::All(&prevouts),
            leaf_hash,
            TapSighashType::Default,
        )
        .unwrap();
    let msg = Message::from_digest(sighash.to_byte_array());
    let provider_sig = TapSignature {
        signature: secp.sign_schnorr_no_aux_rand(&msg, &provider),
        sighash_type: TapSighashType::Default,
    };
    let keeper_sig = TapSignature {
        signature: secp.sign_schnorr_no_aux_rand(&msg, &keeper),
        sighash_type: TapSighashType::Default,
    };
    let depositor_sig = hex::decode(&signatures.optimistic).unwrap();
    let control_block =
        payout_control_block(&prepared.vault.payout_script, *unspendable_key()).unwrap();

    let mut signed_payout = optimistic.clone();
    let mut witness = Witness::new();
    witness.push(keeper_sig.to_vec());
    witness.push(provider_sig.to_vec());
    witness.push(&depositor_sig);
    witness.push(prepared.vault.payout_script.as_bytes());
    witness.push(control_block.serialize());
    signed_payout.input[0].witness = witness;
    consensus_verify(&signed_payout, &prevouts, 0);

    // ═══════════════════════════════════════════════════════════════════════
    // STEP 4: Broadcast after verification
    // ═══════════════════════════════════════════════════════════════════════
    let local = Some(store.get(&owner, &pegin_id).unwrap().status);
    assert_eq!(
        peg_in_display_state(ContractStatus::Pending, local, true).next_action,
        None
    );
    assert_eq!(
        peg_in_display_state(ContractStatus::Verified, local, true).next_action,
        Some(PeginAction::SignAndBroadcastToBitcoin)
    );

    store
        .advance_status(&owner, &pegin_id, LocalStorageStatus::Broadcasting)
        .unwrap();
    let txid = broadcast_pegin_with_local_utxo(
        &wallet,
        &mempool,
        &BroadcastPeginParams {
            funded_tx_hex: &prepared.funded_tx_hex,
            candidates: std::slice::from_ref(&split),
            depositor_pubkey: &depositor_hex,
        },
    )
    .await
    .unwrap();
    assert_eq!(txid, prepared.txid);

    let broadcast_tx = mempool.txs.lock().unwrap()[0].clone();
    consensus_verify(&broadcast_tx, &[split.txout()], 0);

    let status = store
        .apply_action(
            &owner,
            &pegin_id,
            PeginAction::SignAndBroadcastToBitcoin,
            Some(txid.to_string()),
        )
        .unwrap();
    assert_eq!(status, LocalStorageStatus::Confirming);

    // ═══════════════════════════════════════════════════════════════════════
    // STEP 5: Confirmation
    // ═══════════════════════════════════════════════════════════════════════
    let proof = fetch_inclusion_proof(&mempool, &txid, &prepared.vault.script_pubkey)
        .await
        .unwrap()
        .expect("broadcast peg-in should be confirmed");
    assert_eq!(proof.pos, 1);

    let local = Some(store.get(&owner, &pegin_id).unwrap().status);
    let state = peg_in_display_state(ContractStatus::Verified, local, true);
    assert_eq!(state.label, "Confirming");
    let state = peg_in_display_state(ContractStatus::Active, local, true);
    assert_eq!(state.label, "In Position");
    assert_eq!(state.next_action, Some(PeginAction::Redeem));
}

#[tokio::test]
async fn test_unconfirmed_pegin_has_no_proof() {
    let mempool = MemPool::default();
    let txid = Txid::from_byte_array([0x55; 32]);
    let proof = fetch_inclusion_proof(&mempool, &txid, &ScriptBuf::new())
        .await
        .unwrap();
    assert!(proof.is_none());
}
