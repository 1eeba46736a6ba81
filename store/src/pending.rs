//! Pending receivable records.
//!
//! A send block leaves exactly one pending entry at
//! `(destination, send_hash)` until a matching receive or open consumes it.

use kestrel_types::{Account, Amount, BlockHash, Epoch};

use crate::error::StoreError;

/// Composite key for the pending table: destination account, then the hash
/// of the send that created the receivable. Destination-first keying lets a
/// prefix scan enumerate one account's receivables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingKey {
    pub destination: Account,
    pub send_hash: BlockHash,
}

impl PendingKey {
    pub const SERIALIZED_SIZE: usize = 64;

    pub fn new(destination: Account, send_hash: BlockHash) -> Self {
        Self {
            destination,
            send_hash,
        }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[0..32].copy_from_slice(self.destination.as_bytes());
        bytes[32..64].copy_from_slice(self.send_hash.as_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(StoreError::Corrupted(
                "pending key has the wrong length".to_string(),
            ));
        }
        Ok(Self {
            destination: Account::from_bytes(bytes[0..32].try_into().unwrap()),
            send_hash: BlockHash::from_bytes(bytes[32..64].try_into().unwrap()),
        })
    }
}

/// The receivable itself: who sent it, how much, and at which epoch the
/// sender's account sat when the send happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingInfo {
    pub source: Account,
    pub amount: Amount,
    pub epoch: Epoch,
}

impl PendingInfo {
    pub const SERIALIZED_SIZE: usize = 32 + 16 + 1;

    pub fn new(source: Account, amount: Amount, epoch: Epoch) -> Self {
        Self {
            source,
            amount,
            epoch,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.source.as_bytes());
        bytes.extend_from_slice(&self.amount.to_be_bytes());
        bytes.push(self.epoch.as_u8());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(StoreError::Corrupted(
                "pending record has the wrong length".to_string(),
            ));
        }
        let epoch = Epoch::from_u8(bytes[48])
            .ok_or_else(|| StoreError::Corrupted("unknown pending epoch tag".to_string()))?;
        Ok(Self {
            source: Account::from_bytes(bytes[0..32].try_into().unwrap()),
            amount: Amount::from_be_bytes(bytes[32..48].try_into().unwrap()),
            epoch,
        })
    }
}
