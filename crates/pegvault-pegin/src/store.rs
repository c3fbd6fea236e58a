//! Durable tracking of peg-ins the depositor has started.
//!
//! Records are partitioned by depositor address and only change through
//! [`PeginStore::apply_action`] and [`PeginStore::advance_status`], both of
//! which refuse to move a record backwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::state::{status_after, LocalStorageStatus, PeginAction};

/// Errors from store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Peg-in not found: {0}")]
    PeginNotFound(String),
}

/// A peg-in started locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingPeginRequest {
    /// Funding transaction id
    pub id: String,
    pub amount_sat: u64,
    pub provider_ids: Vec<String>,
    #[serde(default)]
    pub depositor_eth_address: String,
    pub depositor_btc_address: String,
    /// Set once the peg-in has been broadcast
    #[serde(default)]
    pub btc_tx_hash: Option<String>,
    pub status: LocalStorageStatus,
    /// Unix timestamp of creation
    pub timestamp: u64,
}

impl PendingPeginRequest {
    pub fn new(id: impl Into<String>, amount_sat: u64, depositor_btc_address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            amount_sat,
            provider_ids: Vec::new(),
            depositor_eth_address: String::new(),
            depositor_btc_address: depositor_btc_address.into(),
            btc_tx_hash: None,
            status: LocalStorageStatus::Created,
            timestamp: unix_now(),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// All tracked peg-ins, keyed by depositor address.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PeginStore {
    pub depositors: BTreeMap<String, Vec<PendingPeginRequest>>,
}

impl PeginStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from file, or start empty if it doesn't exist yet
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::new())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Insert a record, or refresh an existing one with the same id.
    ///
    /// An existing record keeps the later of the two statuses, its creation
    /// time, and its broadcast txid if the update carries none.
    pub fn upsert(&mut self, request: PendingPeginRequest) {
        let records = self
            .depositors
            .entry(request.depositor_btc_address.clone())
            .or_default();

        match records.iter_mut().find(|r| r.id == request.id) {
            Some(existing) => {
                let status = existing.status.advance(request.status);
                let timestamp = existing.timestamp;
                let btc_tx_hash = request.btc_tx_hash.clone().or(existing.btc_tx_hash.take());
                *existing = PendingPeginRequest {
                    status,
                    timestamp,
                    btc_tx_hash,
                    ..request
                };
            }
            None => records.push(request),
        }
    }

    pub fn get(&self, depositor: &str, id: &str) -> Option<&PendingPeginRequest> {
        self.depositors
            .get(depositor)
            .and_then(|records| records.iter().find(|r| r.id == id))
    }

    /// Records for one depositor, oldest first
    pub fn list(&self, depositor: &str) -> &[PendingPeginRequest] {
        self.depositors
            .get(depositor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn get_mut(&mut self, depositor: &str, id: &str) -> Result<&mut PendingPeginRequest, StoreError> {
        self.depositors
            .get_mut(depositor)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::PeginNotFound(id.to_string()))
    }

    /// Record the successful completion of `action`.
    ///
    /// A broadcast txid, when given, is attached to the record.
    pub fn apply_action(
        &mut self,
        depositor: &str,
        id: &str,
        action: PeginAction,
        btc_tx_hash: Option<String>,
    ) -> Result<LocalStorageStatus, StoreError> {
        let record = self.get_mut(depositor, id)?;
        let before = record.status;
        record.status = status_after(record.status, action);
        if let Some(hash) = btc_tx_hash {
            record.btc_tx_hash = Some(hash);
        }
        if record.status != before {
            log::info!("Peg-in {}: {} -> {}", id, before, record.status);
        }
        Ok(record.status)
    }

    /// Move a record forward to `status`; earlier statuses are ignored.
    pub fn advance_status(
        &mut self,
        depositor: &str,
        id: &str,
        status: LocalStorageStatus,
    ) -> Result<LocalStorageStatus, StoreError> {
        let record = self.get_mut(depositor, id)?;
        let before = record.status;
        record.status = before.advance(status);
        if record.status != before {
            log::info!("Peg-in {}: {} -> {}", id, before, record.status);
        }
        Ok(record.status)
    }
}
