//! Public key and network normalization.
//!
//! Keys arrive from wallets and contracts in a handful of shapes: with or
//! without a `0x` prefix, upper or lower case. Everything is normalized to
//! 64 lowercase hex characters before it is parsed.

use std::str::FromStr;

use bitcoin::key::XOnlyPublicKey;
use bitcoin::Network;

use crate::error::ScriptError;

/// Strip an optional `0x`/`0X` prefix and validate the x-only hex format.
///
/// Returns the key as 64 lowercase hex characters.
pub fn normalize_xonly_hex(key: &str) -> Result<String, ScriptError> {
    let trimmed = key.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if stripped.len() != 64 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ScriptError::InvalidPublicKey(format!(
            "expected 64 hex characters (x-only public key), got {:?}",
            key
        )));
    }

    Ok(stripped.to_ascii_lowercase())
}

/// Normalize and parse an x-only public key.
pub fn parse_xonly(key: &str) -> Result<XOnlyPublicKey, ScriptError> {
    let normalized = normalize_xonly_hex(key)?;
    XOnlyPublicKey::from_str(&normalized)
        .map_err(|e| ScriptError::InvalidPublicKey(format!("{}: {}", normalized, e)))
}

/// Normalize and parse a list of x-only public keys, failing on the first bad one.
pub fn parse_xonly_list<S: AsRef<str>>(keys: &[S]) -> Result<Vec<XOnlyPublicKey>, ScriptError> {
    keys.iter().map(|k| parse_xonly(k.as_ref())).collect()
}

/// Parse a network name.
pub fn parse_network(network: &str) -> Result<Network, ScriptError> {
    match network.to_lowercase().as_str() {
        "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
        "testnet" | "testnet3" => Ok(Network::Testnet),
        "signet" => Ok(Network::Signet),
        "regtest" => Ok(Network::Regtest),
        _ => Err(ScriptError::InvalidNetwork(network.to_string())),
    }
}
