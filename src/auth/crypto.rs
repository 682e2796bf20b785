//! Ethereum personal-message signature verification
//!
//! Recovers secp256k1 signers from EIP-191 `personal_sign` signatures.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use thiserror::Error;

use super::address::{strip_hex_prefix, Address};

/// EIP-191 version 0x45 prefix
const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// r (32) + s (32) + v (1)
const SIGNATURE_LEN: usize = 65;

/// Errors that can occur during signature verification
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Invalid signature length: expected 65 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("Public key recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Hash a message the way wallets do for `personal_sign`
///
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`
pub fn hash_personal_message(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Normalize the trailing signature byte to a 0/1 recovery id.
///
/// Wallets emit either the raw parity (0, 1) or the legacy Ethereum
/// convention (27, 28). Anything else is rejected.
pub fn normalize_recovery_id(v: u8) -> Result<u8, CryptoError> {
    match v {
        0 | 1 => Ok(v),
        27 | 28 => Ok(v - 27),
        other => Err(CryptoError::InvalidRecoveryId(other)),
    }
}

/// Derive the wallet address of a secp256k1 public key
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let digest = Keccak256::digest(&point.as_bytes()[1..]);

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::from_bytes(&bytes)
}

/// Recover the address that produced `signature_hex` over `message`
///
/// # Arguments
/// * `message` - The exact text the wallet signed
/// * `signature_hex` - 65-byte signature, hex encoded, `0x` prefix optional
///
/// # Returns
/// * `Ok(Address)` of the signer
/// * `Err(CryptoError)` for malformed input or a failed recovery
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<Address, CryptoError> {
    let bytes = hex::decode(strip_hex_prefix(signature_hex.trim()))
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    if bytes.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignatureLength(bytes.len()));
    }

    let v = normalize_recovery_id(bytes[64])?;

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    let mut recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| CryptoError::RecoveryFailed("recovery id out of range".to_string()))?;

    // k256 only accepts low-s signatures; negating s flips the parity of R
    let signature = match signature.normalize_s() {
        Some(normalized) => {
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
            normalized
        }
        None => signature,
    };

    let digest = hash_personal_message(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;

    Ok(address_from_verifying_key(&key))
}

/// Check that `signature` over `message` was produced by `claimed_address`.
///
/// Every malformed input resolves to `false`; callers only see pass/fail.
pub fn verify_signature(message: &str, signature: &str, claimed_address: &str) -> bool {
    let claimed = match Address::parse(claimed_address) {
        Ok(address) => address,
        Err(_) => return false,
    };

    match recover_signer(message, signature) {
        Ok(recovered) => recovered == claimed,
        Err(e) => {
            tracing::debug!(error = %e, "Signature recovery failed");
            false
        }
    }
}
