//! Unchecked table: missing dependency hash → blocks waiting for it.
//!
//! The table is dup-sort: one key holds many serialized blocks. Records
//! lead with their arrival timestamp, so LMDB's value ordering doubles as
//! insertion order when draining. High-rate inserts can be buffered in an
//! in-memory overlay and flushed under the next write transaction; reads
//! union the overlay.

use std::sync::Mutex;

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use kestrel_store::{StoreError, UncheckedInfo};
use kestrel_types::BlockHash;

use crate::error::map_heed;

pub struct UncheckedStore {
    pub(crate) db: Database<Bytes, Bytes>,
    overlay: Mutex<Vec<(BlockHash, UncheckedInfo)>>,
}

impl UncheckedStore {
    pub(crate) fn new(db: Database<Bytes, Bytes>) -> Self {
        Self {
            db,
            overlay: Mutex::new(Vec::new()),
        }
    }

    /// Park a block under the dependency it waits for.
    pub fn put(
        &self,
        txn: &mut RwTxn,
        dependency: &BlockHash,
        info: &UncheckedInfo,
    ) -> Result<(), StoreError> {
        self.db
            .put(txn, dependency.as_bytes(), &info.to_bytes())
            .map_err(map_heed)
    }

    /// Buffer an insert in the overlay; a later [`Self::flush`] persists it.
    pub fn put_buffered(&self, dependency: BlockHash, info: UncheckedInfo) {
        self.overlay
            .lock()
            .expect("unchecked overlay poisoned")
            .push((dependency, info));
    }

    /// Everything waiting for `dependency`, stored entries first (in
    /// arrival order), then buffered ones.
    pub fn get(
        &self,
        txn: &RoTxn,
        dependency: &BlockHash,
    ) -> Result<Vec<UncheckedInfo>, StoreError> {
        let mut result = Vec::new();
        if let Some(iter) = self
            .db
            .get_duplicates(txn, dependency.as_bytes())
            .map_err(map_heed)?
        {
            for entry in iter {
                let (_key, value) = entry.map_err(map_heed)?;
                result.push(UncheckedInfo::from_bytes(value)?);
            }
        }
        let overlay = self.overlay.lock().expect("unchecked overlay poisoned");
        for (key, info) in overlay.iter() {
            if key == dependency {
                result.push(info.clone());
            }
        }
        Ok(result)
    }

    /// Remove and return everything waiting for `dependency`, from both the
    /// table and the overlay.
    pub fn take(
        &self,
        txn: &mut RwTxn,
        dependency: &BlockHash,
    ) -> Result<Vec<UncheckedInfo>, StoreError> {
        let mut result = Vec::new();
        if let Some(iter) = self
            .db
            .get_duplicates(txn, dependency.as_bytes())
            .map_err(map_heed)?
        {
            for entry in iter {
                let (_key, value) = entry.map_err(map_heed)?;
                result.push(UncheckedInfo::from_bytes(value)?);
            }
        }
        self.db
            .delete(txn, dependency.as_bytes())
            .map_err(map_heed)?;
        let mut overlay = self.overlay.lock().expect("unchecked overlay poisoned");
        let mut kept = Vec::with_capacity(overlay.len());
        for (key, info) in overlay.drain(..) {
            if key == *dependency {
                result.push(info);
            } else {
                kept.push((key, info));
            }
        }
        *overlay = kept;
        Ok(result)
    }

    /// Delete one specific parked block.
    pub fn del(
        &self,
        txn: &mut RwTxn,
        dependency: &BlockHash,
        info: &UncheckedInfo,
    ) -> Result<(), StoreError> {
        self.db
            .delete_one_duplicate(txn, dependency.as_bytes(), &info.to_bytes())
            .map(|_| ())
            .map_err(map_heed)
    }

    /// Entries parked before `cutoff`, removed from table and overlay.
    /// Returns how many were swept.
    pub fn sweep(&self, txn: &mut RwTxn, cutoff: u64) -> Result<u64, StoreError> {
        // Reads complete into a buffer before any delete reopens a cursor.
        let mut expired: Vec<(BlockHash, UncheckedInfo)> = Vec::new();
        {
            let iter = self.db.iter(txn).map_err(map_heed)?;
            for entry in iter {
                let (key, value) = entry.map_err(map_heed)?;
                let key: [u8; 32] = key.try_into().map_err(|_| {
                    StoreError::Corrupted("unchecked key has the wrong length".to_string())
                })?;
                let info = UncheckedInfo::from_bytes(value)?;
                if info.modified < cutoff {
                    expired.push((BlockHash::from_bytes(key), info));
                }
            }
        }
        let mut removed = expired.len() as u64;
        for (dependency, info) in &expired {
            self.del(txn, dependency, info)?;
        }
        let mut overlay = self.overlay.lock().expect("unchecked overlay poisoned");
        let before = overlay.len();
        overlay.retain(|(_, info)| info.modified >= cutoff);
        removed += (before - overlay.len()) as u64;
        Ok(removed)
    }

    /// Stored plus buffered entry count.
    pub fn count(&self, txn: &RoTxn) -> Result<u64, StoreError> {
        let stored = self.db.len(txn).map_err(map_heed)?;
        let buffered = self.overlay.lock().expect("unchecked overlay poisoned").len() as u64;
        Ok(stored + buffered)
    }

    pub fn clear(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        self.overlay
            .lock()
            .expect("unchecked overlay poisoned")
            .clear();
        self.db.clear(txn).map_err(map_heed)
    }

    /// Drain the overlay into the table.
    pub fn flush(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        let buffered: Vec<(BlockHash, UncheckedInfo)> = {
            let mut overlay = self.overlay.lock().expect("unchecked overlay poisoned");
            overlay.drain(..).collect()
        };
        for (dependency, info) in buffered {
            self.put(txn, &dependency, &info)?;
        }
        Ok(())
    }
}
