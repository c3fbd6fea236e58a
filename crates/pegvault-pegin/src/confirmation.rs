//! Confirmation lookups for broadcast peg-ins.
//!
//! Polling here is advisory: it reads chain state and never touches the
//! locally tracked status.

use bitcoin::{Script, Txid};
use serde::{Deserialize, Serialize};

use crate::error::PeginError;
use crate::traits::ChainQuery;

/// Merkle proof that a transaction is included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Position of the transaction in the block
    pub pos: usize,
    /// Merkle branch, display-order hex, leaf to root
    pub merkle: Vec<String>,
    /// Block hash, display-order hex
    pub block_hash: String,
}

/// Fetch the inclusion proof for a peg-in, or `None` while it is unconfirmed.
pub async fn fetch_inclusion_proof(
    chain: &dyn ChainQuery,
    txid: &Txid,
    script_pubkey: &Script,
) -> Result<Option<InclusionProof>, PeginError> {
    let proof = chain
        .inclusion_proof(txid, script_pubkey)
        .await
        .map_err(|e| PeginError::from(e).during("fetch inclusion proof"))?;

    if let Some(proof) = &proof {
        let well_formed = proof
            .merkle
            .iter()
            .chain(std::iter::once(&proof.block_hash))
            .all(|h| h.len() == 64 && h.chars().all(|c| c.is_ascii_hexdigit()));
        if !well_formed {
            return Err(PeginError::validation(format!(
                "Malformed inclusion proof for {}",
                txid
            ))
            .during("fetch inclusion proof"));
        }
        log::debug!(
            "{} confirmed at position {} in block {}",
            txid,
            proof.pos,
            proof.block_hash
        );
    }

    Ok(proof)
}
