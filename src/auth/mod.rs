//! Authentication module for MCPForge
//!
//! Provides wallet-based authentication using Ethereum-style addresses.
//! - Challenge-response authentication with single-use nonces
//! - secp256k1 signer recovery for `personal_sign` signatures
//! - Login-or-register against the identity store
//! - JWT session credentials

mod address;
mod crypto;
mod jwt;
mod nonce;
mod service;

pub use address::{is_valid_address, Address};
pub use crypto::{
    address_from_verifying_key, hash_personal_message, normalize_recovery_id, recover_signer,
    verify_signature, CryptoError,
};
pub use jwt::{Claims, JwtError, SessionIssuer, TOKEN_ISSUER};
pub use nonce::{
    nonce_sweeper, Challenge, Clock, NonceRegistry, SystemClock, DEFAULT_NONCE_TTL_SECONDS,
};
pub use service::{AuthError, AuthService};
