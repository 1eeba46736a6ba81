//! Legacy change block — reassigns an account's voting weight to a new
//! representative without moving funds.

use kestrel_crypto::blake2b_256_multi;
use kestrel_types::{Account, BlockHash, Root, Signature};

use crate::error::BlockError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeBlock {
    pub previous: BlockHash,
    pub representative: Account,
    pub signature: Signature,
    pub work: u64,
}

impl ChangeBlock {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 64 + 8;

    pub fn hash(&self) -> BlockHash {
        BlockHash::from_bytes(blake2b_256_multi(&[
            self.previous.as_bytes(),
            self.representative.as_bytes(),
        ]))
    }

    pub fn root(&self) -> Root {
        Root::from(self.previous)
    }

    /// Wire layout: previous(32) ‖ representative(32) ‖ signature(64) ‖
    /// work(8 LE).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.previous.as_bytes());
        bytes.extend_from_slice(self.representative.as_bytes());
        bytes.extend_from_slice(self.signature.as_bytes());
        bytes.extend_from_slice(&self.work.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(BlockError::InvalidLength {
                expected: Self::SERIALIZED_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            previous: BlockHash::from_bytes(bytes[0..32].try_into().unwrap()),
            representative: Account::from_bytes(bytes[32..64].try_into().unwrap()),
            signature: Signature::from_bytes(bytes[64..128].try_into().unwrap()),
            work: u64::from_le_bytes(bytes[128..136].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChangeBlock {
        ChangeBlock {
            previous: BlockHash::from_bytes([12u8; 32]),
            representative: Account::from_bytes([13u8; 32]),
            signature: Signature::from_bytes([14u8; 64]),
            work: 2,
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let block = sample();
        assert_eq!(ChangeBlock::from_bytes(&block.to_bytes()).unwrap(), block);
    }

    #[test]
    fn hash_depends_on_representative() {
        let base = sample();
        let mut other = base.clone();
        other.representative = Account::from_bytes([15u8; 32]);
        assert_ne!(base.hash(), other.hash());
    }
}
