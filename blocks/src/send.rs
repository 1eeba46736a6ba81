//! Legacy send block — debits an account and creates a pending receivable
//! for the destination.

use kestrel_crypto::blake2b_256_multi;
use kestrel_types::{Account, Amount, BlockHash, Root, Signature};

use crate::error::BlockError;

/// A legacy send. `balance` is the sender's balance *after* the debit; the
/// sent amount is the difference from the predecessor's balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendBlock {
    pub previous: BlockHash,
    pub destination: Account,
    pub balance: Amount,
    pub signature: Signature,
    pub work: u64,
}

impl SendBlock {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 16 + 64 + 8;

    /// Blake2b-256 over the hashable fields in canonical order.
    pub fn hash(&self) -> BlockHash {
        BlockHash::from_bytes(blake2b_256_multi(&[
            self.previous.as_bytes(),
            self.destination.as_bytes(),
            &self.balance.to_le_bytes(),
        ]))
    }

    pub fn root(&self) -> Root {
        Root::from(self.previous)
    }

    /// Wire layout: previous(32) ‖ destination(32) ‖ balance(16 LE) ‖
    /// signature(64) ‖ work(8 LE).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.previous.as_bytes());
        bytes.extend_from_slice(self.destination.as_bytes());
        bytes.extend_from_slice(&self.balance.to_le_bytes());
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
            destination: Account::from_bytes(bytes[32..64].try_into().unwrap()),
            balance: Amount::from_le_bytes(bytes[64..80].try_into().unwrap()),
            signature: Signature::from_bytes(bytes[80..144].try_into().unwrap()),
            work: u64::from_le_bytes(bytes[144..152].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SendBlock {
        SendBlock {
            previous: BlockHash::from_bytes([1u8; 32]),
            destination: Account::from_bytes([2u8; 32]),
            balance: Amount::raw(1000),
            signature: Signature::from_bytes([3u8; 64]),
            work: 0x0102030405060708,
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let block = sample();
        let bytes = block.to_bytes();
        assert_eq!(bytes.len(), SendBlock::SERIALIZED_SIZE);
        assert_eq!(SendBlock::from_bytes(&bytes).unwrap(), block);
    }

    #[test]
    fn hash_excludes_signature_and_work() {
        let block = sample();
        let mut tampered = block.clone();
        tampered.signature = Signature::from_bytes([0xFF; 64]);
        tampered.work = 999;
        assert_eq!(block.hash(), tampered.hash());
    }

    #[test]
    fn hash_covers_every_hashable() {
        let base = sample();
        let mut other = base.clone();
        other.balance = Amount::raw(999);
        assert_ne!(base.hash(), other.hash());
        let mut other = base.clone();
        other.destination = Account::from_bytes([9u8; 32]);
        assert_ne!(base.hash(), other.hash());
    }

    #[test]
    fn truncated_payload_rejected() {
        let bytes = sample().to_bytes();
        assert!(SendBlock::from_bytes(&bytes[..100]).is_err());
    }
}
