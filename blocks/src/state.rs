//! State block — the universal block format.
//!
//! A state block carries the full account state after the operation. The
//! subtype (send, receive, change, epoch) is not written anywhere in the
//! block; the ledger derives it from the balance delta and the link field.

use kestrel_crypto::blake2b_256_multi;
use kestrel_types::{Account, Amount, BlockHash, Link, Root, Signature};

use crate::error::BlockError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateBlock {
    pub account: Account,
    /// Zero when this block opens the account.
    pub previous: BlockHash,
    pub representative: Account,
    /// Account balance after this block.
    pub balance: Amount,
    /// Destination (send), source hash (receive), epoch marker (epoch) or
    /// zero (representative change).
    pub link: Link,
    pub signature: Signature,
    pub work: u64,
}

impl StateBlock {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 32 + 16 + 32 + 64 + 8;

    pub fn hash(&self) -> BlockHash {
        BlockHash::from_bytes(blake2b_256_multi(&[
            self.account.as_bytes(),
            self.previous.as_bytes(),
            self.representative.as_bytes(),
            &self.balance.to_be_bytes(),
            self.link.as_bytes(),
        ]))
    }

    pub fn root(&self) -> Root {
        if self.previous.is_zero() {
            Root::from(self.account)
        } else {
            Root::from(self.previous)
        }
    }

    /// Whether this block opens its account.
    pub fn is_open(&self) -> bool {
        self.previous.is_zero()
    }

    /// Wire layout: account(32) ‖ previous(32) ‖ representative(32) ‖
    /// balance(16 BE) ‖ link(32) ‖ signature(64) ‖ work(8 BE).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.account.as_bytes());
        bytes.extend_from_slice(self.previous.as_bytes());
        bytes.extend_from_slice(self.representative.as_bytes());
        bytes.extend_from_slice(&self.balance.to_be_bytes());
        bytes.extend_from_slice(self.link.as_bytes());
        bytes.extend_from_slice(self.signature.as_bytes());
        bytes.extend_from_slice(&self.work.to_be_bytes());
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
            account: Account::from_bytes(bytes[0..32].try_into().unwrap()),
            previous: BlockHash::from_bytes(bytes[32..64].try_into().unwrap()),
            representative: Account::from_bytes(bytes[64..96].try_into().unwrap()),
            balance: Amount::from_be_bytes(bytes[96..112].try_into().unwrap()),
            link: Link::from_bytes(bytes[112..144].try_into().unwrap()),
            signature: Signature::from_bytes(bytes[144..208].try_into().unwrap()),
            work: u64::from_be_bytes(bytes[208..216].try_into().unwrap()),
        })
    }
}
