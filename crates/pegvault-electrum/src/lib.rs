//! PegVault Electrum Client
//!
//! Provides Bitcoin network access via Electrum protocol for:
//! - Split output lookup (peg-in funding)
//! - Transaction broadcasting (peg-in submission)
//! - Inclusion proofs (peg-in confirmation)
//!
//! # Security
//!
//! - Always use SSL/TLS connections (ssl:// or tcp+tls://)
//! - Electrum servers only ever see public data
//!
//! # Example
//!
//! ```ignore
//! use pegvault_electrum::ElectrumClient;
//! use pegvault_electrum::ElectrumService;
//!
//! let client = ElectrumClient::new("ssl://electrum.blockstream.info:60002")?;
//! let tx = client.get_transaction(&txid)?;
//! let proof = ElectrumService::new(client)
//!     .inclusion_proof(&txid, &tx.output[0].script_pubkey)
//!     .await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::{Network, OutPoint, Script, Transaction, TxMerkleNode, Txid};
use electrum_client::{ElectrumApi, Error as ElectrumError};
use pegvault_pegin::{Broadcaster, ChainQuery, InclusionProof, ServiceError};
use pegvault_tx::{decode_transaction, Utxo};
use thiserror::Error;

/// Errors from Electrum operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Electrum protocol error: {0}")]
    Protocol(#[from] ElectrumError),

    #[error("Transaction not found: {0}")]
    TxNotFound(Txid),

    #[error("Output not found: {0}")]
    OutputNotFound(OutPoint),

    #[error("Output already spent: {0}")]
    Spent(OutPoint),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<Error> for ServiceError {
    fn from(e: Error) -> Self {
        ServiceError::new(e.to_string())
    }
}

/// Electrum client for Bitcoin network operations
pub struct ElectrumClient {
    client: electrum_client::Client,
}

impl ElectrumClient {
    /// Create a new Electrum client
    ///
    /// # Arguments
    /// * `url` - Electrum server URL (e.g., "ssl://electrum.blockstream.info:60002")
    ///
    /// # Security
    /// Always use SSL URLs in production. Plaintext connections can be MITM'd.
    pub fn new(url: &str) -> Result<Self, Error> {
        if !url.starts_with("ssl://") && !url.contains("tls") {
            log::warn!("Connecting to Electrum without SSL - insecure for mainnet!");
        }

        let client = electrum_client::Client::new(url)
            .map_err(|e: ElectrumError| Error::Connection(e.to_string()))?;

        Ok(Self { client })
    }

    /// Get a transaction by txid
    pub fn get_transaction(&self, txid: &Txid) -> Result<Transaction, Error> {
        self.client
            .transaction_get(txid)
            .map_err(|_| Error::TxNotFound(*txid))
    }

    /// Look up an unspent output, e.g. the split output funding a peg-in.
    pub fn get_unspent_output(&self, outpoint: &OutPoint) -> Result<Utxo, Error> {
        let tx = self.get_transaction(&outpoint.txid)?;
        let txout = tx
            .output
            .get(outpoint.vout as usize)
            .ok_or(Error::OutputNotFound(*outpoint))?;

        let unspent = self.client.script_list_unspent(&txout.script_pubkey)?;
        let is_unspent = unspent
            .iter()
            .any(|u| u.tx_hash == outpoint.txid && u.tx_pos as u32 == outpoint.vout);
        if !is_unspent {
            return Err(Error::Spent(*outpoint));
        }

        Ok(Utxo {
            txid: outpoint.txid,
            vout: outpoint.vout,
            value: txout.value,
            script_pubkey: txout.script_pubkey.clone(),
        })
    }

    /// Broadcast a signed transaction given as hex
    ///
    /// # Returns
    /// The txid reported by the server
    pub fn broadcast_hex(&self, tx_hex: &str) -> Result<Txid, Error> {
        let tx = decode_transaction(tx_hex)
            .map_err(|e| Error::InvalidTransaction(e.to_string()))?;
        self.client
            .transaction_broadcast(&tx)
            .map_err(|e: ElectrumError| Error::BroadcastFailed(e.to_string()))
    }

    /// Merkle inclusion proof for `txid`, or `None` while unconfirmed.
    ///
    /// The confirmation height comes from the history of `script_pubkey`,
    /// which must be an output script of the transaction.
    pub fn get_inclusion_proof(
        &self,
        txid: &Txid,
        script_pubkey: &Script,
    ) -> Result<Option<InclusionProof>, Error> {
        let history = self.client.script_get_history(script_pubkey)?;
        let height = match history.iter().find(|h| h.tx_hash == *txid) {
            Some(entry) if entry.height > 0 => entry.height as usize,
            _ => return Ok(None),
        };

        let merkle = self.client.transaction_get_merkle(txid, height)?;
        let header = self.client.block_header(merkle.block_height)?;

        Ok(Some(InclusionProof {
            pos: merkle.pos,
            merkle: merkle
                .merkle
                .iter()
                .map(|node| TxMerkleNode::from_byte_array(*node).to_string())
                .collect(),
            block_hash: header.block_hash().to_string(),
        }))
    }
}

/// Async adapter running the blocking client on tokio's blocking pool.
#[derive(Clone)]
pub struct ElectrumService {
    client: Arc<ElectrumClient>,
}

impl ElectrumService {
    pub fn new(client: ElectrumClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&ElectrumClient) -> Result<T, Error> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || f(&client))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}

#[async_trait]
impl Broadcaster for ElectrumService {
    async fn push_tx(&self, tx_hex: &str) -> Result<Txid, ServiceError> {
        let tx_hex = tx_hex.to_string();
        let txid = self.run(move |c| c.broadcast_hex(&tx_hex)).await?;
        log::info!("Electrum accepted {}", txid);
        Ok(txid)
    }
}

#[async_trait]
impl ChainQuery for ElectrumService {
    async fn inclusion_proof(
        &self,
        txid: &Txid,
        script_pubkey: &Script,
    ) -> Result<Option<InclusionProof>, ServiceError> {
        let txid = *txid;
        let script_pubkey = script_pubkey.to_owned();
        Ok(self
            .run(move |c| c.get_inclusion_proof(&txid, &script_pubkey))
            .await?)
    }
}

/// Default Electrum servers for each network
pub fn default_server(network: Network) -> &'static str {
    match network {
        Network::Bitcoin => "ssl://electrum.blockstream.info:60002",
        Network::Testnet => "ssl://electrum.blockstream.info:60004",
        Network::Signet => "ssl://mempool.space:60602",
        Network::Regtest => "tcp://127.0.0.1:60401",
        _ => "ssl://electrum.blockstream.info:60002",
    }
}
