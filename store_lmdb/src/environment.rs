//! LMDB environment setup and transaction handles.

use std::fs;
use std::path::Path;

use heed::types::Bytes;
use heed::{DatabaseFlags, EnvOpenOptions, RoTxn, RwTxn};

use kestrel_store::StoreError;

use crate::account::AccountStore;
use crate::block::BlockStore;
use crate::block_info::BlockInfoStore;
use crate::checksum::ChecksumStore;
use crate::error::map_heed;
use crate::frontier::FrontierStore;
use crate::meta::MetaStore;
use crate::migration::Migrator;
use crate::pending::PendingStore;
use crate::rep_weights::RepresentationStore;
use crate::unchecked::UncheckedStore;
use crate::vote::VoteStore;

/// Maximum database size. LMDB maps this much address space up front; the
/// file grows on demand.
const MAP_SIZE: usize = 32 * 1024 * 1024 * 1024;
const MAX_DBS: u32 = 16;

/// The process-owned database directory: one environment, all logical
/// tables, one writer.
pub struct LmdbStore {
    env: heed::Env,
    pub accounts: AccountStore,
    pub blocks: BlockStore,
    pub pending: PendingStore,
    pub frontiers: FrontierStore,
    pub blocks_info: BlockInfoStore,
    pub representation: RepresentationStore,
    pub unchecked: UncheckedStore,
    pub votes: VoteStore,
    pub checksum: ChecksumStore,
    pub meta: MetaStore,
}

impl LmdbStore {
    /// Open or create the environment at `path` and bring the schema up to
    /// date. Refuses directories written by a newer schema version.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(path)
            .map_err(|e| StoreError::BadTransaction(format!("create data dir: {e}")))?;
        // Safety: the environment is opened once per process per data dir.
        let env = unsafe { EnvOpenOptions::new().map_size(MAP_SIZE).max_dbs(MAX_DBS).open(path) }
            .map_err(map_heed)?;

        let mut wtxn = env.write_txn().map_err(map_heed)?;
        let accounts = AccountStore {
            db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("accounts"))
                .map_err(map_heed)?,
        };
        let blocks = BlockStore {
            send_db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("send_blocks"))
                .map_err(map_heed)?,
            receive_db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("receive_blocks"))
                .map_err(map_heed)?,
            open_db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("open_blocks"))
                .map_err(map_heed)?,
            change_db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("change_blocks"))
                .map_err(map_heed)?,
            state_db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("state_blocks"))
                .map_err(map_heed)?,
        };
        let pending = PendingStore {
            db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("pending"))
                .map_err(map_heed)?,
        };
        let frontiers = FrontierStore {
            db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("frontiers"))
                .map_err(map_heed)?,
        };
        let blocks_info = BlockInfoStore {
            db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("blocks_info"))
                .map_err(map_heed)?,
        };
        let representation = RepresentationStore {
            db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("representation"))
                .map_err(map_heed)?,
        };
        let unchecked = UncheckedStore::new(
            env.database_options()
                .types::<Bytes, Bytes>()
                .name("unchecked")
                .flags(DatabaseFlags::DUP_SORT)
                .create(&mut wtxn)
                .map_err(map_heed)?,
        );
        let votes = VoteStore::new(
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("votes"))
                .map_err(map_heed)?,
        );
        let checksum = ChecksumStore {
            db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("checksum"))
                .map_err(map_heed)?,
        };
        let meta = MetaStore {
            db: env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some("meta"))
                .map_err(map_heed)?,
        };

        wtxn.commit().map_err(map_heed)?;

        let store = Self {
            env,
            accounts,
            blocks,
            pending,
            frontiers,
            blocks_info,
            representation,
            unchecked,
            votes,
            checksum,
            meta,
        };
        // All migration steps run under one write transaction.
        let mut wtxn = store.env.write_txn().map_err(map_heed)?;
        Migrator::run(&store, &mut wtxn)?;
        wtxn.commit().map_err(map_heed)?;
        Ok(store)
    }

    /// Begin a snapshot-isolated read transaction.
    pub fn tx_begin_read(&self) -> Result<RoTxn<'_>, StoreError> {
        self.env.read_txn().map_err(map_heed)
    }

    /// Begin the write transaction. Blocks while another writer is active.
    pub fn tx_begin_write(&self) -> Result<RwTxn<'_>, StoreError> {
        self.env.write_txn().map_err(map_heed)
    }

    /// Drain the in-memory overlays (buffered unchecked inserts and votes)
    /// into their tables under `txn`.
    pub fn flush(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        self.unchecked.flush(txn)?;
        self.votes.flush(txn)?;
        Ok(())
    }

    pub fn env(&self) -> &heed::Env {
        &self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::CURRENT_SCHEMA_VERSION;

    #[test]
    fn open_creates_schema_at_current_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let txn = store.tx_begin_read().unwrap();
        assert_eq!(
            store.meta.version_get(&txn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn reopen_preserves_version() {
        let dir = tempfile::tempdir().unwrap();
        drop(LmdbStore::open(dir.path()).unwrap());
        let store = LmdbStore::open(dir.path()).unwrap();
        let txn = store.tx_begin_read().unwrap();
        assert_eq!(
            store.meta.version_get(&txn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn write_txn_sees_own_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let mut txn = store.tx_begin_write().unwrap();
        store.meta.version_put(&mut txn, 99).unwrap();
        assert_eq!(store.meta.version_get(&txn).unwrap(), Some(99));
        // Dropped without commit — the change must not persist.
        drop(txn);
        let txn = store.tx_begin_read().unwrap();
        assert_eq!(
            store.meta.version_get(&txn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
