//! Representation table: representative account → delegated weight.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::StoreError;
use kestrel_types::{Account, Amount};

use crate::error::map_heed;

pub struct RepresentationStore {
    pub(crate) db: Database<Bytes, Bytes>,
}

impl RepresentationStore {
    pub fn get(&self, txn: &RoTxn, account: &Account) -> Result<Amount, StoreError> {
        match self.db.get(txn, account.as_bytes()).map_err(map_heed)? {
            Some(bytes) => {
                let arr: [u8; 16] = bytes.try_into().map_err(|_| {
                    StoreError::Corrupted("representation value has the wrong length".to_string())
                })?;
                Ok(Amount::from_be_bytes(arr))
            }
            None => Ok(Amount::ZERO),
        }
    }

    pub fn put(&self, txn: &mut RwTxn, account: &Account, weight: Amount) -> Result<(), StoreError> {
        if weight.is_zero() {
            self.db
                .delete(txn, account.as_bytes())
                .map(|_| ())
                .map_err(map_heed)
        } else {
            self.db
                .put(txn, account.as_bytes(), &weight.to_be_bytes())
                .map_err(map_heed)
        }
    }

    /// Credit `delta` of voting weight to `account`.
    pub fn add(&self, txn: &mut RwTxn, account: &Account, delta: Amount) -> Result<(), StoreError> {
        let current = self.get(txn, account)?;
        let next = current.checked_add(delta).ok_or_else(|| {
            StoreError::Corrupted("representation weight overflows the supply".to_string())
        })?;
        self.put(txn, account, next)
    }

    /// Remove `delta` of voting weight from `account`. Underflow means the
    /// weight bookkeeping no longer matches the chain and is fatal.
    pub fn subtract(
        &self,
        txn: &mut RwTxn,
        account: &Account,
        delta: Amount,
    ) -> Result<(), StoreError> {
        let current = self.get(txn, account)?;
        let next = current.checked_sub(delta).ok_or_else(|| {
            StoreError::Corrupted("representation weight underflow".to_string())
        })?;
        self.put(txn, account, next)
    }

    pub fn clear(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        self.db.clear(txn).map_err(map_heed)
    }

    pub fn iter<'t>(
        &self,
        txn: &'t RoTxn,
    ) -> Result<impl Iterator<Item = Result<(Account, Amount), StoreError>> + 't, StoreError> {
        let iter = self.db.iter(txn).map_err(map_heed)?;
        Ok(iter.map(|entry| {
            let (key, value) = entry.map_err(map_heed)?;
            let key: [u8; 32] = key.try_into().map_err(|_| {
                StoreError::Corrupted("representation key has the wrong length".to_string())
            })?;
            let value: [u8; 16] = value.try_into().map_err(|_| {
                StoreError::Corrupted("representation value has the wrong length".to_string())
            })?;
            Ok((Account::from_bytes(key), Amount::from_be_bytes(value)))
        }))
    }
}
