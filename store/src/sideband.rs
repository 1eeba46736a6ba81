//! Block sideband — per-block metadata that is not part of the hash.
//!
//! Stored after the block payload in the block tables and reconstructed from
//! ledger state on write. The hash is a pure function of the hashables; the
//! sideband never feeds into it.

use kestrel_types::{Account, Amount, BlockHash, Epoch};

use crate::error::StoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSideband {
    /// Hash of the next block in the chain; zero at the frontier.
    pub successor: BlockHash,
    /// The account this block belongs to.
    pub account: Account,
    /// Position in the account chain, starting at 1 for the open block.
    pub height: u64,
    /// Seconds since epoch when the block was stored locally.
    pub timestamp: u64,
    /// Account balance after this block.
    pub balance: Amount,
    /// Epoch of the account as of this block (for receives, after the
    /// source epoch has been absorbed).
    pub epoch: Epoch,
}

impl BlockSideband {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 8 + 8 + 16 + 1;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.successor.as_bytes());
        bytes.extend_from_slice(self.account.as_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.balance.to_be_bytes());
        bytes.push(self.epoch.as_u8());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(StoreError::Corrupted(format!(
                "sideband has {} bytes, expected {}",
                bytes.len(),
                Self::SERIALIZED_SIZE
            )));
        }
        let epoch = Epoch::from_u8(bytes[96])
            .ok_or_else(|| StoreError::Corrupted("unknown sideband epoch tag".to_string()))?;
        Ok(Self {
            successor: BlockHash::from_bytes(bytes[0..32].try_into().unwrap()),
            account: Account::from_bytes(bytes[32..64].try_into().unwrap()),
            height: u64::from_le_bytes(bytes[64..72].try_into().unwrap()),
            timestamp: u64::from_le_bytes(bytes[72..80].try_into().unwrap()),
            balance: Amount::from_be_bytes(bytes[80..96].try_into().unwrap()),
            epoch,
        })
    }
}
