//! CLI configuration: parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network};
use pegvault_script::{normalize_xonly_hex, parse_network};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// General settings
    #[serde(default)]
    pub server: ServerSection,

    /// Bitcoin / Electrum settings
    #[serde(default)]
    pub bitcoin: BitcoinSection,

    /// Vault participants
    pub vault: VaultSection,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Data directory (peg-in store)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Bitcoin network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinSection {
    /// Bitcoin network: "bitcoin", "testnet", "signet", "regtest"
    #[serde(default = "default_network")]
    pub network: String,

    /// Electrum server URL; empty selects the network default
    #[serde(default)]
    pub electrum_url: String,

    /// Fee rate for peg-in funding, sat/vB
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
}

impl Default for BitcoinSection {
    fn default() -> Self {
        Self {
            network: default_network(),
            electrum_url: String::new(),
            fee_rate: default_fee_rate(),
        }
    }
}

/// Vault participants and the depositor's wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSection {
    /// Depositor x-only public key (hex, optional 0x prefix)
    pub depositor_pubkey: String,

    /// Vault provider x-only public key
    pub vault_provider_pubkey: String,

    /// Liquidator x-only public keys
    pub liquidator_pubkeys: Vec<String>,

    /// Depositor wallet address; peg-ins are tracked under it
    pub depositor_address: String,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from("./pegvault-data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_network() -> String {
    "bitcoin".to_string()
}

fn default_fee_rate() -> f64 {
    2.0
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `PEGVAULT_DATA_DIR`
    /// - `PEGVAULT_LOG_LEVEL`
    /// - `PEGVAULT_NETWORK`
    /// - `PEGVAULT_ELECTRUM_URL`
    /// - `PEGVAULT_FEE_RATE`
    /// - `PEGVAULT_DEPOSITOR_PUBKEY`
    /// - `PEGVAULT_VAULT_PROVIDER_PUBKEY`
    /// - `PEGVAULT_LIQUIDATOR_PUBKEYS` (comma-separated)
    /// - `PEGVAULT_DEPOSITOR_ADDRESS`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PEGVAULT_DATA_DIR") {
            self.server.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PEGVAULT_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("PEGVAULT_NETWORK") {
            self.bitcoin.network = v;
        }
        if let Ok(v) = std::env::var("PEGVAULT_ELECTRUM_URL") {
            self.bitcoin.electrum_url = v;
        }
        if let Ok(v) = std::env::var("PEGVAULT_FEE_RATE") {
            if let Ok(rate) = v.parse::<f64>() {
                self.bitcoin.fee_rate = rate;
            }
        }
        if let Ok(v) = std::env::var("PEGVAULT_DEPOSITOR_PUBKEY") {
            self.vault.depositor_pubkey = v;
        }
        if let Ok(v) = std::env::var("PEGVAULT_VAULT_PROVIDER_PUBKEY") {
            self.vault.vault_provider_pubkey = v;
        }
        if let Ok(v) = std::env::var("PEGVAULT_LIQUIDATOR_PUBKEYS") {
            self.vault.liquidator_pubkeys = v
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("PEGVAULT_DEPOSITOR_ADDRESS") {
            self.vault.depositor_address = v;
        }
    }

    /// Parse the bitcoin network string to a `bitcoin::Network`.
    pub fn network(&self) -> Result<Network> {
        parse_network(&self.bitcoin.network)
            .with_context(|| format!("bitcoin.network '{}' is not supported", self.bitcoin.network))
    }

    /// Configured Electrum URL, or the network default.
    pub fn electrum_url(&self) -> Result<String> {
        if self.bitcoin.electrum_url.is_empty() {
            Ok(pegvault_electrum::default_server(self.network()?).to_string())
        } else {
            Ok(self.bitcoin.electrum_url.clone())
        }
    }

    /// Location of the peg-in store.
    pub fn store_path(&self) -> PathBuf {
        self.server.data_dir.join("pegins.json")
    }

    /// Depositor wallet address, checked against the configured network.
    pub fn depositor_address(&self) -> Result<Address> {
        let network = self.network()?;
        self.vault
            .depositor_address
            .parse::<Address<NetworkUnchecked>>()
            .context("vault.depositor_address is not a valid address")?
            .require_network(network)
            .with_context(|| format!("vault.depositor_address is not a {} address", network))
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.network()?;

        normalize_xonly_hex(&self.vault.depositor_pubkey)
            .context("vault.depositor_pubkey is invalid")?;
        normalize_xonly_hex(&self.vault.vault_provider_pubkey)
            .context("vault.vault_provider_pubkey is invalid")?;

        anyhow::ensure!(
            !self.vault.liquidator_pubkeys.is_empty(),
            "vault.liquidator_pubkeys must not be empty"
        );
        for (i, key) in self.vault.liquidator_pubkeys.iter().enumerate() {
            normalize_xonly_hex(key)
                .with_context(|| format!("vault.liquidator_pubkeys[{}] is invalid", i))?;
        }

        self.depositor_address()?;

        pegvault_tx::validate_fee_rate(self.bitcoin.fee_rate)
            .context("bitcoin.fee_rate is out of range")?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
