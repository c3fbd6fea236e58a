//! Deterministic keys for tests.

use bitcoin::key::XOnlyPublicKey;
use bitcoin::secp256k1::{Secp256k1, SecretKey};

/// X-only key for the secret `[0x01, 0x00, ..., 0x00, seed]`.
pub fn test_xonly(seed_byte: u8) -> XOnlyPublicKey {
    let secp = Secp256k1::new();
    let mut bytes = [0u8; 32];
    bytes[31] = seed_byte;
    bytes[0] = 0x01;
    let sk = SecretKey::from_slice(&bytes).unwrap();
    sk.x_only_public_key(&secp).0
}
