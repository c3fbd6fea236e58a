//! PSBT encoding helpers.

use base64::prelude::*;
use bitcoin::psbt::Psbt;

use crate::error::TxError;

/// Decode a PSBT given as hex or base64.
///
/// Signers disagree on the encoding they hand back, so both are accepted.
pub fn decode_psbt(encoded: &str) -> Result<Psbt, TxError> {
    let bytes = decode_psbt_bytes(encoded)?;
    Psbt::deserialize(&bytes).map_err(|e| TxError::validation(format!("Invalid PSBT: {}", e)))
}

/// Raw PSBT bytes from hex or base64 text.
pub(crate) fn decode_psbt_bytes(encoded: &str) -> Result<Vec<u8>, TxError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(TxError::validation("Empty PSBT"));
    }

    if trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        hex::decode(trimmed).map_err(|e| TxError::validation(format!("Invalid PSBT hex: {}", e)))
    } else {
        BASE64_STANDARD
            .decode(trimmed)
            .map_err(|e| TxError::validation(format!("Invalid PSBT base64: {}", e)))
    }
}

/// Serialize a PSBT to hex.
pub fn psbt_to_hex(psbt: &Psbt) -> String {
    hex::encode(psbt.serialize())
}
