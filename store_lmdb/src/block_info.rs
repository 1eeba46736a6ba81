//! Sparse block checkpoint table: block hash → (account, balance).
//!
//! Written by pre-sideband schema versions; read only by the migration that
//! backfills sideband balances.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::{BlockInfo, StoreError};
use kestrel_types::BlockHash;

use crate::error::map_heed;

pub struct BlockInfoStore {
    pub(crate) db: Database<Bytes, Bytes>,
}

impl BlockInfoStore {
    pub fn put(&self, txn: &mut RwTxn, hash: &BlockHash, info: &BlockInfo) -> Result<(), StoreError> {
        self.db
            .put(txn, hash.as_bytes(), &info.to_bytes())
            .map_err(map_heed)
    }

    pub fn get(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Option<BlockInfo>, StoreError> {
        match self.db.get(txn, hash.as_bytes()).map_err(map_heed)? {
            Some(bytes) => Ok(Some(BlockInfo::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn del(&self, txn: &mut RwTxn, hash: &BlockHash) -> Result<(), StoreError> {
        self.db
            .delete(txn, hash.as_bytes())
            .map(|_| ())
            .map_err(map_heed)
    }

    pub fn count(&self, txn: &RoTxn) -> Result<u64, StoreError> {
        self.db.len(txn).map_err(map_heed)
    }

    pub fn clear(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        self.db.clear(txn).map_err(map_heed)
    }
}
