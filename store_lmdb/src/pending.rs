//! Pending table: (destination, send hash) → receivable record.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::{PendingInfo, PendingKey, StoreError};
use kestrel_types::Account;

use crate::error::map_heed;
use crate::increment_prefix;

pub struct PendingStore {
    pub(crate) db: Database<Bytes, Bytes>,
}

impl PendingStore {
    pub fn put(
        &self,
        txn: &mut RwTxn,
        key: &PendingKey,
        info: &PendingInfo,
    ) -> Result<(), StoreError> {
        self.db
            .put(txn, &key.to_bytes(), &info.to_bytes())
            .map_err(map_heed)
    }

    pub fn get(&self, txn: &RoTxn, key: &PendingKey) -> Result<Option<PendingInfo>, StoreError> {
        match self.db.get(txn, &key.to_bytes()).map_err(map_heed)? {
            Some(bytes) => Ok(Some(PendingInfo::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn del(&self, txn: &mut RwTxn, key: &PendingKey) -> Result<(), StoreError> {
        self.db
            .delete(txn, &key.to_bytes())
            .map(|_| ())
            .map_err(map_heed)
    }

    pub fn exists(&self, txn: &RoTxn, key: &PendingKey) -> Result<bool, StoreError> {
        Ok(self.get(txn, key)?.is_some())
    }

    pub fn count(&self, txn: &RoTxn) -> Result<u64, StoreError> {
        self.db.len(txn).map_err(map_heed)
    }

    /// All receivables addressed to `destination`, in send-hash order.
    pub fn iter_account<'t>(
        &self,
        txn: &'t RoTxn,
        destination: &Account,
    ) -> Result<impl Iterator<Item = Result<(PendingKey, PendingInfo), StoreError>> + 't, StoreError>
    {
        let prefix = *destination.as_bytes();
        let mut upper = prefix;
        let bounded = increment_prefix(&mut upper);
        let lower = prefix.to_vec();
        let upper = upper.to_vec();
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = if bounded {
            (Bound::Included(lower.as_slice()), Bound::Excluded(upper.as_slice()))
        } else {
            (Bound::Included(lower.as_slice()), Bound::Unbounded)
        };
        let iter = self.db.range(txn, &bounds).map_err(map_heed)?;
        Ok(iter.map(decode_entry))
    }

    /// Cursor over the whole table.
    pub fn iter<'t>(
        &self,
        txn: &'t RoTxn,
    ) -> Result<impl Iterator<Item = Result<(PendingKey, PendingInfo), StoreError>> + 't, StoreError>
    {
        let iter = self.db.iter(txn).map_err(map_heed)?;
        Ok(iter.map(decode_entry))
    }
}

fn decode_entry(
    entry: Result<(&[u8], &[u8]), heed::Error>,
) -> Result<(PendingKey, PendingInfo), StoreError> {
    let (key, value) = entry.map_err(map_heed)?;
    Ok((PendingKey::from_bytes(key)?, PendingInfo::from_bytes(value)?))
}
