// src/models/address.rs
//! Participant addresses and the role derived from them.
//!
//! Addresses follow the Ethereum rules the registry contract expects:
//! 20 bytes written as 40 hex digits with an optional `0x` prefix. Mixed-case
//! input must carry a valid EIP-55 checksum.

use crate::error::DiplomaError;
use ethers::types::H160;
use ethers::utils::{hex, to_checksum};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated participant address (issuer or holder).
///
/// Equality compares the underlying 20 bytes, so two spellings that differ
/// only in letter case are the same address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(H160);

impl Address {
    /// Parses and validates a raw address string.
    ///
    /// # Arguments
    /// * `raw` - User or ledger supplied text, surrounding whitespace ignored
    ///
    /// # Errors
    /// Returns [`DiplomaError::InvalidAddress`] when the text is not 40 hex
    /// digits, or when a mixed-case spelling fails the checksum.
    pub fn parse(raw: &str) -> Result<Self, DiplomaError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DiplomaError::InvalidAddress(raw.to_string()));
        }

        let bytes = hex::decode(digits).map_err(|_| DiplomaError::InvalidAddress(raw.to_string()))?;
        let address = Address(H160::from_slice(&bytes));

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.checksummed()[2..] != *digits {
            return Err(DiplomaError::InvalidAddress(raw.to_string()));
        }

        Ok(address)
    }

    /// Quick check used by input forms before building a command.
    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// EIP-55 checksummed spelling with `0x` prefix.
    pub fn checksummed(&self) -> String {
        to_checksum(&self.0, None)
    }

    pub fn as_h160(&self) -> H160 {
        self.0
    }
}

impl From<H160> for Address {
    fn from(value: H160) -> Self {
        Address(value)
    }
}

impl FromStr for Address {
    type Err = DiplomaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.checksummed())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.checksummed())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.checksummed())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Role of the connected caller, derived from the admin address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The contract admin; may create, update and delete diplomas.
    Issuer,
    /// Any other account; may read its own diplomas.
    Holder,
}

impl Role {
    /// Derives the role by comparing the caller with the ledger's admin.
    pub fn derive(caller: &Address, admin: &Address) -> Self {
        if caller == admin {
            Role::Issuer
        } else {
            Role::Holder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOWER: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn accepts_lowercase_and_checksummed_spellings() {
        let a = Address::parse(LOWER).unwrap();
        let b = Address::parse(CHECKSUMMED).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), CHECKSUMMED);
    }

    #[test]
    fn accepts_missing_prefix_and_surrounding_whitespace() {
        let a = Address::parse("  5aaeb6053f3e94c9b9a09f33669435e7ef1beaed \n").unwrap();
        assert_eq!(a, Address::parse(LOWER).unwrap());
    }

    #[test]
    fn rejects_bad_checksum() {
        let broken = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert!(matches!(Address::parse(broken), Err(DiplomaError::InvalidAddress(_))));
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!(!Address::is_valid("0xABC"));
        assert!(!Address::is_valid(""));
        assert!(!Address::is_valid("0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(!Address::is_valid("not an address at all, clearly not one!!"));
    }

    #[test]
    fn role_comparison_ignores_case() {
        let admin = Address::parse(LOWER).unwrap();
        let caller = Address::parse(&LOWER.to_uppercase().replacen("0X", "0x", 1)).unwrap();
        assert_eq!(Role::derive(&caller, &admin), Role::Issuer);

        let other = Address::parse("0x0000000000000000000000000000000000000001").unwrap();
        assert_eq!(Role::derive(&other, &admin), Role::Holder);
    }

    #[test]
    fn serde_uses_checksummed_text() {
        let a = Address::parse(LOWER).unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{}\"", CHECKSUMMED));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
