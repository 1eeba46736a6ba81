//! Vote table: voter account → newest full vote.
//!
//! Sequences are monotone per voter: a stored vote is only ever replaced by
//! one with a strictly higher sequence. An in-memory overlay batches
//! high-rate vote arrivals; reads union the overlay by taking the newest of
//! the two.

use std::collections::HashMap;
use std::sync::Mutex;

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::{StoreError, Vote};
use kestrel_types::Account;

use crate::error::map_heed;

pub struct VoteStore {
    pub(crate) db: Database<Bytes, Bytes>,
    overlay: Mutex<HashMap<Account, Vote>>,
}

impl VoteStore {
    pub(crate) fn new(db: Database<Bytes, Bytes>) -> Self {
        Self {
            db,
            overlay: Mutex::new(HashMap::new()),
        }
    }

    fn get_stored(&self, txn: &RoTxn, voter: &Account) -> Result<Option<Vote>, StoreError> {
        match self.db.get(txn, voter.as_bytes()).map_err(map_heed)? {
            Some(bytes) => Ok(Some(Vote::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    /// The newest known vote by `voter`, stored or buffered.
    pub fn get(&self, txn: &RoTxn, voter: &Account) -> Result<Option<Vote>, StoreError> {
        let stored = self.get_stored(txn, voter)?;
        let buffered = self
            .overlay
            .lock()
            .expect("vote overlay poisoned")
            .get(voter)
            .cloned();
        Ok(match (stored, buffered) {
            (Some(a), Some(b)) => Some(if b.sequence > a.sequence { b } else { a }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        })
    }

    /// Insert-or-replace, but only when `vote.sequence` is strictly higher
    /// than what is already known for the voter. Returns whether the table
    /// changed.
    pub fn put_if_newer(&self, txn: &mut RwTxn, vote: &Vote) -> Result<bool, StoreError> {
        if let Some(existing) = self.get(txn, &vote.voter)? {
            if existing.sequence >= vote.sequence {
                return Ok(false);
            }
        }
        self.db
            .put(txn, vote.voter.as_bytes(), &vote.to_bytes())
            .map_err(map_heed)?;
        Ok(true)
    }

    /// Buffer a vote in the overlay, keeping only the newest per voter.
    /// Returns whether the overlay changed.
    pub fn put_buffered(&self, vote: Vote) -> bool {
        let mut overlay = self.overlay.lock().expect("vote overlay poisoned");
        match overlay.get(&vote.voter) {
            Some(existing) if existing.sequence >= vote.sequence => false,
            _ => {
                overlay.insert(vote.voter, vote);
                true
            }
        }
    }

    /// Drain the overlay into the table, preserving sequence monotonicity.
    pub fn flush(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        let buffered: Vec<Vote> = {
            let mut overlay = self.overlay.lock().expect("vote overlay poisoned");
            overlay.drain().map(|(_, vote)| vote).collect()
        };
        for vote in buffered {
            self.put_if_newer(txn, &vote)?;
        }
        Ok(())
    }

    pub fn count(&self, txn: &RoTxn) -> Result<u64, StoreError> {
        self.db.len(txn).map_err(map_heed)
    }

    pub fn clear(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        self.overlay.lock().expect("vote overlay poisoned").clear();
        self.db.clear(txn).map_err(map_heed)
    }

    pub fn iter<'t>(
        &self,
        txn: &'t RoTxn,
    ) -> Result<impl Iterator<Item = Result<(Account, Vote), StoreError>> + 't, StoreError> {
        let iter = self.db.iter(txn).map_err(map_heed)?;
        Ok(iter.map(|entry| {
            let (key, value) = entry.map_err(map_heed)?;
            let key: [u8; 32] = key
                .try_into()
                .map_err(|_| StoreError::Corrupted("vote key has the wrong length".to_string()))?;
            Ok((Account::from_bytes(key), Vote::from_bytes(value)?))
        }))
    }
}
