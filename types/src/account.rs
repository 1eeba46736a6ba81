//! Account identifier — a 256-bit value that is also an Ed25519 public key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A 256-bit account identifier.
///
/// The same bytes serve as the account's Ed25519 public key for signature
/// verification. The all-zero account is the burn account and may never be
/// opened.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account([u8; 32]);

impl Account {
    /// The burn account. Funds sent here are unrecoverable.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The lexicographically next account, wrapping to zero at the top.
    ///
    /// Used to build exclusive upper bounds for store range scans.
    pub fn successor(&self) -> Self {
        let mut bytes = self.0;
        for byte in bytes.iter_mut().rev() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                break;
            }
        }
        Self(bytes)
    }

    pub fn encode_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn decode_hex(s: &str) -> Result<Self, ParseError> {
        let bytes = hex::decode(s).map_err(|_| ParseError::InvalidHex)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ParseError::InvalidLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0[..4].iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "Account({}…)", head)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode_hex())
    }
}

impl FromStr for Account {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_hex(s)
    }
}

impl From<crate::hash::BlockHash> for Account {
    fn from(hash: crate::hash::BlockHash) -> Self {
        Self(*hash.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_account_is_zero() {
        assert!(Account::ZERO.is_zero());
        assert!(!Account::from_bytes([1u8; 32]).is_zero());
    }

    #[test]
    fn hex_roundtrip() {
        let account = Account::from_bytes([0xAB; 32]);
        let encoded = account.encode_hex();
        assert_eq!(Account::decode_hex(&encoded).unwrap(), account);
    }

    #[test]
    fn decode_rejects_bad_length() {
        assert!(Account::decode_hex("ABCD").is_err());
        assert!(Account::decode_hex("zz").is_err());
    }

    #[test]
    fn successor_increments_low_byte() {
        let mut bytes = [0u8; 32];
        bytes[31] = 5;
        let next = Account::from_bytes(bytes).successor();
        let mut expected = [0u8; 32];
        expected[31] = 6;
        assert_eq!(next, Account::from_bytes(expected));
    }

    #[test]
    fn successor_carries() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0xFF;
        let next = Account::from_bytes(bytes).successor();
        let mut expected = [0u8; 32];
        expected[30] = 1;
        assert_eq!(next, Account::from_bytes(expected));
    }

    #[test]
    fn successor_wraps_at_top() {
        assert_eq!(Account::from_bytes([0xFF; 32]).successor(), Account::ZERO);
    }
}
