//! Meta table: schema version under the constant key `1`.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::StoreError;

use crate::error::map_heed;

const VERSION_KEY: [u8; 1] = [1];

pub struct MetaStore {
    pub(crate) db: Database<Bytes, Bytes>,
}

impl MetaStore {
    pub fn version_get(&self, txn: &RoTxn) -> Result<Option<u32>, StoreError> {
        match self.db.get(txn, &VERSION_KEY).map_err(map_heed)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    StoreError::Corrupted("schema version has the wrong length".to_string())
                })?;
                Ok(Some(u32::from_le_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    pub fn version_put(&self, txn: &mut RwTxn, version: u32) -> Result<(), StoreError> {
        self.db
            .put(txn, &VERSION_KEY, &version.to_le_bytes())
            .map_err(map_heed)
    }
}
