//! Legacy receive block — credits an account by claiming a pending
//! receivable created by a send.

use kestrel_crypto::blake2b_256_multi;
use kestrel_types::{BlockHash, Root, Signature};

use crate::error::BlockError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveBlock {
    pub previous: BlockHash,
    /// Hash of the send block being claimed.
    pub source: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

impl ReceiveBlock {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 64 + 8;

    pub fn hash(&self) -> BlockHash {
        BlockHash::from_bytes(blake2b_256_multi(&[
            self.previous.as_bytes(),
            self.source.as_bytes(),
        ]))
    }

    pub fn root(&self) -> Root {
        Root::from(self.previous)
    }

    /// Wire layout: previous(32) ‖ source(32) ‖ signature(64) ‖ work(8 LE).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.previous.as_bytes());
        bytes.extend_from_slice(self.source.as_bytes());
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
            source: BlockHash::from_bytes(bytes[32..64].try_into().unwrap()),
            signature: Signature::from_bytes(bytes[64..128].try_into().unwrap()),
            work: u64::from_le_bytes(bytes[128..136].try_into().unwrap()),
        })
    }
}
