//! Legacy open block — the first block of an account's chain, claiming a
//! pending receivable and naming the initial representative.

use kestrel_crypto::blake2b_256_multi;
use kestrel_types::{Account, BlockHash, Root, Signature};

use crate::error::BlockError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenBlock {
    /// Hash of the send block being claimed.
    pub source: BlockHash,
    pub representative: Account,
    pub account: Account,
    pub signature: Signature,
    pub work: u64,
}

impl OpenBlock {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 32 + 64 + 8;

    pub fn hash(&self) -> BlockHash {
        BlockHash::from_bytes(blake2b_256_multi(&[
            self.source.as_bytes(),
            self.representative.as_bytes(),
            self.account.as_bytes(),
        ]))
    }

    /// An open block has no previous; its root is the account itself.
    pub fn root(&self) -> Root {
        Root::from(self.account)
    }

    /// Wire layout: source(32) ‖ representative(32) ‖ account(32) ‖
    /// signature(64) ‖ work(8 LE).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.source.as_bytes());
        bytes.extend_from_slice(self.representative.as_bytes());
        bytes.extend_from_slice(self.account.as_bytes());
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
            source: BlockHash::from_bytes(bytes[0..32].try_into().unwrap()),
            representative: Account::from_bytes(bytes[32..64].try_into().unwrap()),
            account: Account::from_bytes(bytes[64..96].try_into().unwrap()),
            signature: Signature::from_bytes(bytes[96..160].try_into().unwrap()),
            work: u64::from_le_bytes(bytes[160..168].try_into().unwrap()),
        })
    }
}
