//! Account table: account → account record.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::{AccountInfo, StoreError};
use kestrel_types::Account;

use crate::error::map_heed;

pub struct AccountStore {
    pub(crate) db: Database<Bytes, Bytes>,
}

impl AccountStore {
    pub fn put(
        &self,
        txn: &mut RwTxn,
        account: &Account,
        info: &AccountInfo,
    ) -> Result<(), StoreError> {
        self.db
            .put(txn, account.as_bytes(), &info.to_bytes())
            .map_err(map_heed)
    }

    pub fn get(&self, txn: &RoTxn, account: &Account) -> Result<Option<AccountInfo>, StoreError> {
        match self.db.get(txn, account.as_bytes()).map_err(map_heed)? {
            Some(bytes) => Ok(Some(AccountInfo::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn del(&self, txn: &mut RwTxn, account: &Account) -> Result<(), StoreError> {
        self.db
            .delete(txn, account.as_bytes())
            .map(|_| ())
            .map_err(map_heed)
    }

    pub fn exists(&self, txn: &RoTxn, account: &Account) -> Result<bool, StoreError> {
        Ok(self.get(txn, account)?.is_some())
    }

    pub fn count(&self, txn: &RoTxn) -> Result<u64, StoreError> {
        self.db.len(txn).map_err(map_heed)
    }

    /// Ordered cursor over all accounts.
    pub fn iter<'t>(
        &self,
        txn: &'t RoTxn,
    ) -> Result<impl Iterator<Item = Result<(Account, AccountInfo), StoreError>> + 't, StoreError>
    {
        let iter = self.db.iter(txn).map_err(map_heed)?;
        Ok(iter.map(decode_entry))
    }

    /// Ordered cursor starting at the first account ≥ `start`.
    pub fn iter_from<'t>(
        &self,
        txn: &'t RoTxn,
        start: &Account,
    ) -> Result<impl Iterator<Item = Result<(Account, AccountInfo), StoreError>> + 't, StoreError>
    {
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) =
            (Bound::Included(start.as_bytes().as_slice()), Bound::Unbounded);
        let iter = self.db.range(txn, &bounds).map_err(map_heed)?;
        Ok(iter.map(decode_entry))
    }
}

fn decode_entry(
    entry: Result<(&[u8], &[u8]), heed::Error>,
) -> Result<(Account, AccountInfo), StoreError> {
    let (key, value) = entry.map_err(map_heed)?;
    let key: [u8; 32] = key
        .try_into()
        .map_err(|_| StoreError::Corrupted("account key has the wrong length".to_string()))?;
    Ok((Account::from_bytes(key), AccountInfo::from_bytes(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::LmdbStore;
    use kestrel_types::{Amount, BlockHash, Epoch};

    fn info(balance: u128) -> AccountInfo {
        AccountInfo {
            head: BlockHash::from_bytes([1u8; 32]),
            open_block: BlockHash::from_bytes([2u8; 32]),
            rep_block: BlockHash::from_bytes([1u8; 32]),
            balance: Amount::raw(balance),
            modified: 1000,
            block_count: 1,
            epoch: Epoch::Epoch0,
        }
    }

    #[test]
    fn put_get_del() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let account = Account::from_bytes([5u8; 32]);

        let mut txn = store.tx_begin_write().unwrap();
        assert!(store.accounts.get(&txn, &account).unwrap().is_none());
        store.accounts.put(&mut txn, &account, &info(10)).unwrap();
        assert_eq!(store.accounts.get(&txn, &account).unwrap(), Some(info(10)));
        store.accounts.del(&mut txn, &account).unwrap();
        assert!(store.accounts.get(&txn, &account).unwrap().is_none());
    }

    #[test]
    fn iter_is_ordered_by_account() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let mut txn = store.tx_begin_write().unwrap();
        for byte in [3u8, 1, 2] {
            let account = Account::from_bytes([byte; 32]);
            store.accounts.put(&mut txn, &account, &info(byte as u128)).unwrap();
        }
        txn.commit().unwrap();

        let txn = store.tx_begin_read().unwrap();
        let keys: Vec<Account> = store
            .accounts
            .iter(&txn)
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(
            keys,
            vec![
                Account::from_bytes([1u8; 32]),
                Account::from_bytes([2u8; 32]),
                Account::from_bytes([3u8; 32]),
            ]
        );
    }

    #[test]
    fn iter_from_starts_at_bound() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let mut txn = store.tx_begin_write().unwrap();
        for byte in [1u8, 2, 3] {
            let account = Account::from_bytes([byte; 32]);
            store.accounts.put(&mut txn, &account, &info(1)).unwrap();
        }
        txn.commit().unwrap();

        let txn = store.tx_begin_read().unwrap();
        let first = store
            .accounts
            .iter_from(&txn, &Account::from_bytes([2u8; 32]))
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .0;
        assert_eq!(first, Account::from_bytes([2u8; 32]));
    }
}
