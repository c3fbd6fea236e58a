//! PegVault CLI: prepare, inspect and track vault peg-ins
//!
//! # Usage
//!
//! ```bash
//! pegvault --config pegvault.toml validate
//! pegvault --config pegvault.toml prepare <txid:vout> <amount_sat> <change_address>
//! pegvault --config pegvault.toml status <pegin_id> verified
//! ```

mod commands;
mod config;

use anyhow::{Context, Result};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI args (minimal, no clap dependency needed)
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("pegvault.toml");
    let mut ready = false;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--ready" => {
                ready = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("pegvault {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other if other.starts_with("--") => {
                anyhow::bail!("Unknown argument: {}", other);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let Some((command, rest)) = positional.split_first() else {
        print_help();
        anyhow::bail!("No command given");
    };

    // Load config
    let mut config = config::CliConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Apply env overrides
    config.apply_env_overrides();

    // Validate
    config
        .validate()
        .context("Configuration validation failed")?;

    // Init logger
    std::env::set_var("RUST_LOG", &config.server.log_level);
    env_logger::init();

    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    match (command.as_str(), rest.as_slice()) {
        ("validate", []) => commands::validate(&config),
        ("script", []) => commands::script(&config),
        ("prepare", [outpoint, amount, change]) => {
            commands::prepare(&config, outpoint, amount, change)
        }
        ("payout", [kind, payout, pegin, second]) => {
            commands::payout(&config, kind, payout, pegin, second)
        }
        ("extract-signature", [psbt]) => commands::extract_signature(&config, psbt),
        ("status", [pegin_id, contract]) => commands::status(&config, pegin_id, contract, ready),
        ("proof", [txid]) => commands::proof(&config, txid),
        (command, args) => anyhow::bail!(
            "Unknown command or wrong arguments: {} ({} argument(s)); see --help",
            command,
            args.len()
        ),
    }
}

fn print_help() {
    println!(
        r#"PegVault: vault peg-in preparation and tracking

USAGE:
    pegvault [OPTIONS] <COMMAND>

COMMANDS:
    validate                                   Validate config and print a summary
    script                                     Print the vault payout script
    prepare <txid:vout> <amount> <change>      Fund a peg-in from a split output and track it
    payout <optimistic|challenge> <payout_hex> <pegin_hex> <claim_or_assert_hex>
                                               Print the unsigned payout PSBT
    extract-signature <signed_psbt>            Print the depositor signature (hex or base64 PSBT)
    status <pegin_id> <pending|verified|active> [--ready]
                                               Print the display state of a tracked peg-in
    proof <txid>                               Print the inclusion proof of a peg-in

OPTIONS:
    -c, --config <PATH>   Config file path (default: pegvault.toml)
    --ready               Payout transactions are published (status)
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    PEGVAULT_DATA_DIR               Data directory path
    PEGVAULT_LOG_LEVEL              Log level (error/warn/info/debug/trace)
    PEGVAULT_NETWORK                Bitcoin network (bitcoin/testnet/signet/regtest)
    PEGVAULT_ELECTRUM_URL           Electrum server URL
    PEGVAULT_FEE_RATE               Fee rate in sat/vB
    PEGVAULT_DEPOSITOR_PUBKEY       Depositor x-only public key
    PEGVAULT_VAULT_PROVIDER_PUBKEY  Vault provider x-only public key
    PEGVAULT_LIQUIDATOR_PUBKEYS     Comma-separated liquidator keys
    PEGVAULT_DEPOSITOR_ADDRESS      Depositor wallet address
"#
    );
}
