//! Checksum table: (prefix, mask) region → rolling XOR digest of the
//! account frontiers in that region.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::StoreError;
use kestrel_types::BlockHash;

use crate::error::map_heed;

pub struct ChecksumStore {
    pub(crate) db: Database<Bytes, Bytes>,
}

fn region_key(prefix: u64, mask: u8) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0..8].copy_from_slice(&prefix.to_be_bytes());
    key[8] = mask;
    key
}

impl ChecksumStore {
    pub fn put(
        &self,
        txn: &mut RwTxn,
        prefix: u64,
        mask: u8,
        digest: &BlockHash,
    ) -> Result<(), StoreError> {
        self.db
            .put(txn, &region_key(prefix, mask), digest.as_bytes())
            .map_err(map_heed)
    }

    pub fn get(&self, txn: &RoTxn, prefix: u64, mask: u8) -> Result<Option<BlockHash>, StoreError> {
        match self
            .db
            .get(txn, &region_key(prefix, mask))
            .map_err(map_heed)?
        {
            Some(bytes) => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| {
                    StoreError::Corrupted("checksum value has the wrong length".to_string())
                })?;
                Ok(Some(BlockHash::from_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    pub fn del(&self, txn: &mut RwTxn, prefix: u64, mask: u8) -> Result<(), StoreError> {
        self.db
            .delete(txn, &region_key(prefix, mask))
            .map(|_| ())
            .map_err(map_heed)
    }

    pub fn clear(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        self.db.clear(txn).map_err(map_heed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::LmdbStore;

    #[test]
    fn regions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let mut txn = store.tx_begin_write().unwrap();

        let a = BlockHash::from_bytes([1u8; 32]);
        let b = BlockHash::from_bytes([2u8; 32]);
        store.checksum.put(&mut txn, 0, 0, &a).unwrap();
        store.checksum.put(&mut txn, 1, 0, &b).unwrap();

        assert_eq!(store.checksum.get(&txn, 0, 0).unwrap(), Some(a));
        assert_eq!(store.checksum.get(&txn, 1, 0).unwrap(), Some(b));
        store.checksum.del(&mut txn, 0, 0).unwrap();
        assert_eq!(store.checksum.get(&txn, 0, 0).unwrap(), None);
    }
}
