//! Per-account ledger record.

use kestrel_types::{Amount, BlockHash, Epoch};

use crate::error::StoreError;

/// The latest state of one account chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    /// Hash of the newest block in the chain (the frontier).
    pub head: BlockHash,
    /// Hash of the first block in the chain.
    pub open_block: BlockHash,
    /// Hash of the newest block that named a representative.
    pub rep_block: BlockHash,
    /// Balance after `head`.
    pub balance: Amount,
    /// Seconds since epoch at the last head change.
    pub modified: u64,
    /// Number of blocks in the chain.
    pub block_count: u64,
    /// Schema epoch of the account.
    pub epoch: Epoch,
}

impl AccountInfo {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 32 + 16 + 8 + 8 + 1;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.head.as_bytes());
        bytes.extend_from_slice(self.open_block.as_bytes());
        bytes.extend_from_slice(self.rep_block.as_bytes());
        bytes.extend_from_slice(&self.balance.to_be_bytes());
        bytes.extend_from_slice(&self.modified.to_le_bytes());
        bytes.extend_from_slice(&self.block_count.to_le_bytes());
        bytes.push(self.epoch.as_u8());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(StoreError::Corrupted(format!(
                "account record has {} bytes, expected {}",
                bytes.len(),
                Self::SERIALIZED_SIZE
            )));
        }
        let epoch = Epoch::from_u8(bytes[128])
            .ok_or_else(|| StoreError::Corrupted("unknown account epoch tag".to_string()))?;
        Ok(Self {
            head: BlockHash::from_bytes(bytes[0..32].try_into().unwrap()),
            open_block: BlockHash::from_bytes(bytes[32..64].try_into().unwrap()),
            rep_block: BlockHash::from_bytes(bytes[64..96].try_into().unwrap()),
            balance: Amount::from_be_bytes(bytes[96..112].try_into().unwrap()),
            modified: u64::from_le_bytes(bytes[112..120].try_into().unwrap()),
            block_count: u64::from_le_bytes(bytes[120..128].try_into().unwrap()),
            epoch,
        })
    }
}
