//! Frontier table: legacy head hash → owning account.
//!
//! Maintained only for legacy blocks. State blocks carry their account
//! in-band, and omitting them here also stops legacy blocks from being
//! appended on top of a state head.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::StoreError;
use kestrel_types::{Account, BlockHash};

use crate::error::map_heed;

pub struct FrontierStore {
    pub(crate) db: Database<Bytes, Bytes>,
}

impl FrontierStore {
    pub fn put(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
        account: &Account,
    ) -> Result<(), StoreError> {
        self.db
            .put(txn, hash.as_bytes(), account.as_bytes())
            .map_err(map_heed)
    }

    pub fn get(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Option<Account>, StoreError> {
        match self.db.get(txn, hash.as_bytes()).map_err(map_heed)? {
            Some(bytes) => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| {
                    StoreError::Corrupted("frontier value has the wrong length".to_string())
                })?;
                Ok(Some(Account::from_bytes(arr)))
            }
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

    pub fn iter<'t>(
        &self,
        txn: &'t RoTxn,
    ) -> Result<impl Iterator<Item = Result<(BlockHash, Account), StoreError>> + 't, StoreError>
    {
        let iter = self.db.iter(txn).map_err(map_heed)?;
        Ok(iter.map(|entry| {
            let (key, value) = entry.map_err(map_heed)?;
            let key: [u8; 32] = key.try_into().map_err(|_| {
                StoreError::Corrupted("frontier key has the wrong length".to_string())
            })?;
            let value: [u8; 32] = value.try_into().map_err(|_| {
                StoreError::Corrupted("frontier value has the wrong length".to_string())
            })?;
            Ok((BlockHash::from_bytes(key), Account::from_bytes(value)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::LmdbStore;

    #[test]
    fn put_get_del() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let mut txn = store.tx_begin_write().unwrap();

        let hash = BlockHash::from_bytes([1u8; 32]);
        let account = Account::from_bytes([2u8; 32]);
        store.frontiers.put(&mut txn, &hash, &account).unwrap();
        assert_eq!(store.frontiers.get(&txn, &hash).unwrap(), Some(account));
        assert_eq!(store.frontiers.count(&txn).unwrap(), 1);
        store.frontiers.del(&mut txn, &hash).unwrap();
        assert_eq!(store.frontiers.get(&txn, &hash).unwrap(), None);
    }
}
