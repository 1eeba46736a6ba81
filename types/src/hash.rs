//! Block hash, link and root types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::account::Account;
use crate::error::ParseError;

/// A 32-byte block hash — the Blake2b-256 digest of a block's hashables.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
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

    pub fn encode_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn decode_hex(s: &str) -> Result<Self, ParseError> {
        let bytes = hex::decode(s).map_err(|_| ParseError::InvalidHex)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ParseError::InvalidLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0[..4].iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "BlockHash({}…)", head)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode_hex())
    }
}

impl FromStr for BlockHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_hex(s)
    }
}

impl From<Account> for BlockHash {
    fn from(account: Account) -> Self {
        Self(*account.as_bytes())
    }
}

/// The link field of a state block.
///
/// Interpreted by context: a destination account for a send subtype, a source
/// block hash for a receive subtype, the configured epoch marker for an epoch
/// subtype, or zero for a representative change.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link([u8; 32]);

impl Link {
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

    pub fn as_account(&self) -> Account {
        Account::from_bytes(self.0)
    }

    pub fn as_block_hash(&self) -> BlockHash {
        BlockHash::from_bytes(self.0)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0[..4].iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "Link({}…)", head)
    }
}

impl From<Account> for Link {
    fn from(account: Account) -> Self {
        Self(*account.as_bytes())
    }
}

impl From<BlockHash> for Link {
    fn from(hash: BlockHash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// The slot identifier over which elections are held.
///
/// `previous` for any block with a predecessor, else the account being
/// opened. Two blocks with the same root contend for the same chain position.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Root([u8; 32]);

impl Root {
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
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0[..4].iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "Root({}…)", head)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

impl From<BlockHash> for Root {
    fn from(hash: BlockHash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl From<Account> for Root {
    fn from(account: Account) -> Self {
        Self(*account.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_hex_roundtrip() {
        let hash = BlockHash::from_bytes([0x5A; 32]);
        assert_eq!(BlockHash::decode_hex(&hash.encode_hex()).unwrap(), hash);
    }

    #[test]
    fn link_reinterprets_both_ways() {
        let link = Link::from_bytes([7u8; 32]);
        assert_eq!(link.as_account().as_bytes(), link.as_bytes());
        assert_eq!(link.as_block_hash().as_bytes(), link.as_bytes());
    }

    #[test]
    fn root_from_hash_and_account_compare_equal() {
        let bytes = [9u8; 32];
        let from_hash = Root::from(BlockHash::from_bytes(bytes));
        let from_account = Root::from(Account::from_bytes(bytes));
        assert_eq!(from_hash, from_account);
    }
}
