//! Unchecked block records.
//!
//! Blocks whose dependency (previous or source) has not arrived yet are
//! parked in the dup-sort unchecked table, keyed by the missing hash, and
//! drained when it shows up.

use kestrel_blocks::Block;

use crate::error::StoreError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UncheckedInfo {
    pub block: Block,
    /// Seconds since epoch when the block was parked; drives the sweep.
    pub modified: u64,
}

impl UncheckedInfo {
    pub fn new(block: Block, modified: u64) -> Self {
        Self { block, modified }
    }

    /// `modified(8 LE) ‖ type_tag ‖ block payload`. The timestamp leads so
    /// records for one key keep a stable prefix layout regardless of the
    /// block variant's size.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(9 + self.block.to_bytes().len());
        bytes.extend_from_slice(&self.modified.to_le_bytes());
        bytes.extend_from_slice(&self.block.serialize_with_type());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < 9 {
            return Err(StoreError::Corrupted(
                "unchecked record too short".to_string(),
            ));
        }
        let modified = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let block = Block::deserialize_with_type(&bytes[8..])
            .map_err(|e| StoreError::Corrupted(format!("unchecked block: {e}")))?;
        Ok(Self { block, modified })
    }
}
