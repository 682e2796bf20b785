//! Wallet address parsing and canonicalization
//!
//! Every component that stores or compares addresses goes through
//! [`Address::parse`], so map keys and store identifiers always use the
//! canonical `0x`-prefixed lower-case form.

use std::fmt;

use serde::Serialize;

use super::crypto::CryptoError;

/// Number of hex characters in an address body (20 bytes)
const ADDRESS_HEX_LEN: usize = 40;

/// A syntactically valid, canonicalized wallet address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse and canonicalize a user-supplied address.
    ///
    /// Accepts an optional `0x`/`0X` prefix followed by exactly 40 hex
    /// characters in any case.
    pub fn parse(input: &str) -> Result<Self, CryptoError> {
        if !is_valid_address(input) {
            return Err(CryptoError::InvalidAddressFormat(format!(
                "expected 0x followed by {} hex characters",
                ADDRESS_HEX_LEN
            )));
        }

        Ok(Self(format!(
            "0x{}",
            strip_hex_prefix(input).to_ascii_lowercase()
        )))
    }

    /// Build an address from the 20 raw bytes derived from a public key
    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Canonical string form (`0x` + lower-case hex)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check address syntax without allocating a canonical copy.
///
/// Surrounding whitespace is not stripped.
pub fn is_valid_address(input: &str) -> bool {
    let body = strip_hex_prefix(input);
    body.len() == ADDRESS_HEX_LEN && body.bytes().all(|b| b.is_ascii_hexdigit())
}

pub(crate) fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}
