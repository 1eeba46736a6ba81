//! Block tables: one table per variant, keyed by block hash.
//!
//! Values are `block payload ‖ sideband`. The type tag is implied by the
//! table and re-attached on read. Successor links live in the sideband and
//! are rewritten in place as the chain grows or rolls back.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_blocks::{Block, BlockType};
use kestrel_store::{BlockSideband, StoreError};
use kestrel_types::BlockHash;

use crate::error::map_heed;

pub struct BlockStore {
    pub(crate) send_db: Database<Bytes, Bytes>,
    pub(crate) receive_db: Database<Bytes, Bytes>,
    pub(crate) open_db: Database<Bytes, Bytes>,
    pub(crate) change_db: Database<Bytes, Bytes>,
    pub(crate) state_db: Database<Bytes, Bytes>,
}

/// Lookup order for cross-table operations. State first: on a mature ledger
/// nearly every block is a state block.
const TABLE_ORDER: [BlockType; 5] = [
    BlockType::State,
    BlockType::Send,
    BlockType::Receive,
    BlockType::Open,
    BlockType::Change,
];

impl BlockStore {
    fn table(&self, block_type: BlockType) -> &Database<Bytes, Bytes> {
        match block_type {
            BlockType::Send => &self.send_db,
            BlockType::Receive => &self.receive_db,
            BlockType::Open => &self.open_db,
            BlockType::Change => &self.change_db,
            BlockType::State => &self.state_db,
            BlockType::Invalid | BlockType::NotABlock => {
                unreachable!("no table for pseudo block types")
            }
        }
    }

    pub fn put(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
        block: &Block,
        sideband: &BlockSideband,
    ) -> Result<(), StoreError> {
        let mut value = block.to_bytes();
        value.extend_from_slice(&sideband.to_bytes());
        self.table(block.block_type())
            .put(txn, hash.as_bytes(), &value)
            .map_err(map_heed)
    }

    /// Fetch a block and its sideband, searching all variant tables.
    pub fn get(
        &self,
        txn: &RoTxn,
        hash: &BlockHash,
    ) -> Result<Option<(Block, BlockSideband)>, StoreError> {
        for block_type in TABLE_ORDER {
            if let Some(bytes) = self
                .table(block_type)
                .get(txn, hash.as_bytes())
                .map_err(map_heed)?
            {
                return decode_entry(block_type, bytes).map(Some);
            }
        }
        Ok(None)
    }

    pub fn exists(&self, txn: &RoTxn, hash: &BlockHash) -> Result<bool, StoreError> {
        for block_type in TABLE_ORDER {
            if self
                .table(block_type)
                .get(txn, hash.as_bytes())
                .map_err(map_heed)?
                .is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether a block of this exact variant exists — the duplicate check
    /// used by the ledger's `old` test.
    pub fn exists_typed(
        &self,
        txn: &RoTxn,
        block_type: BlockType,
        hash: &BlockHash,
    ) -> Result<bool, StoreError> {
        Ok(self
            .table(block_type)
            .get(txn, hash.as_bytes())
            .map_err(map_heed)?
            .is_some())
    }

    pub fn del(&self, txn: &mut RwTxn, hash: &BlockHash) -> Result<(), StoreError> {
        for block_type in TABLE_ORDER {
            if self
                .table(block_type)
                .delete(txn, hash.as_bytes())
                .map_err(map_heed)?
            {
                return Ok(());
            }
        }
        Ok(())
    }

    /// The stored successor of `hash`, zero when it is a frontier.
    pub fn successor(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Option<BlockHash>, StoreError> {
        Ok(self.get(txn, hash)?.map(|(_, sideband)| sideband.successor))
    }

    /// Point `hash`'s sideband successor at `successor`.
    pub fn successor_set(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
        successor: &BlockHash,
    ) -> Result<(), StoreError> {
        let (block, mut sideband) = self.get(txn, hash)?.ok_or(StoreError::NotFound)?;
        sideband.successor = *successor;
        self.put(txn, hash, &block, &sideband)
    }

    /// Clear `hash`'s successor link (after its child is rolled back).
    pub fn successor_clear(&self, txn: &mut RwTxn, hash: &BlockHash) -> Result<(), StoreError> {
        self.successor_set(txn, hash, &BlockHash::ZERO)
    }

    /// Total blocks across all variant tables.
    pub fn count(&self, txn: &RoTxn) -> Result<u64, StoreError> {
        let mut total = 0;
        for block_type in TABLE_ORDER {
            total += self.table(block_type).len(txn).map_err(map_heed)?;
        }
        Ok(total)
    }

    /// Per-variant table count, used for random sampling and migrations.
    pub fn count_typed(&self, txn: &RoTxn, block_type: BlockType) -> Result<u64, StoreError> {
        self.table(block_type).len(txn).map_err(map_heed)
    }

    /// A pseudo-random block: pick a table weighted by its population, then
    /// take the lexicographically next entry after `seed`, wrapping to the
    /// first. No scan, two cursor positioning operations at most.
    pub fn random(
        &self,
        txn: &RoTxn,
        seed: &BlockHash,
    ) -> Result<Option<(Block, BlockSideband)>, StoreError> {
        let mut counts = [0u64; 5];
        for (slot, block_type) in TABLE_ORDER.iter().enumerate() {
            counts[slot] = self.table(*block_type).len(txn).map_err(map_heed)?;
        }
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return Ok(None);
        }
        let mut offset = u64::from_le_bytes(seed.as_bytes()[0..8].try_into().unwrap()) % total;
        let mut chosen = TABLE_ORDER[0];
        for (slot, block_type) in TABLE_ORDER.iter().enumerate() {
            if offset < counts[slot] {
                chosen = *block_type;
                break;
            }
            offset -= counts[slot];
        }
        let db = self.table(chosen);

        let bounds: (Bound<&[u8]>, Bound<&[u8]>) =
            (Bound::Included(seed.as_bytes().as_slice()), Bound::Unbounded);
        let entry = match db.range(txn, &bounds).map_err(map_heed)?.next() {
            Some(entry) => Some(entry.map_err(map_heed)?),
            None => db.first(txn).map_err(map_heed)?,
        };
        match entry {
            Some((_key, value)) => decode_entry(chosen, value).map(Some),
            None => Ok(None),
        }
    }

    /// Cursor over one variant table.
    pub fn iter_typed<'t>(
        &self,
        txn: &'t RoTxn,
        block_type: BlockType,
    ) -> Result<
        impl Iterator<Item = Result<(BlockHash, Block, BlockSideband), StoreError>> + 't,
        StoreError,
    > {
        let iter = self.table(block_type).iter(txn).map_err(map_heed)?;
        Ok(iter.map(move |entry| {
            let (key, value) = entry.map_err(map_heed)?;
            let key: [u8; 32] = key
                .try_into()
                .map_err(|_| StoreError::Corrupted("block key has the wrong length".to_string()))?;
            let (block, sideband) = decode_entry(block_type, value)?;
            Ok((BlockHash::from_bytes(key), block, sideband))
        }))
    }
}

fn decode_entry(block_type: BlockType, bytes: &[u8]) -> Result<(Block, BlockSideband), StoreError> {
    let payload_size = block_type
        .serialized_size()
        .ok_or_else(|| StoreError::Corrupted("pseudo block type in table".to_string()))?;
    if bytes.len() != payload_size + BlockSideband::SERIALIZED_SIZE {
        return Err(StoreError::Corrupted(format!(
            "block entry has {} bytes, expected {}",
            bytes.len(),
            payload_size + BlockSideband::SERIALIZED_SIZE
        )));
    }
    let block = Block::deserialize(block_type, &bytes[..payload_size])
        .map_err(|e| StoreError::Corrupted(format!("block payload: {e}")))?;
    let sideband = BlockSideband::from_bytes(&bytes[payload_size..])?;
    Ok((block, sideband))
}
