//! Database schema migration engine.
//!
//! A monotonically increasing schema version lives in the meta table. On
//! open, older databases are brought up to date by running the steps in
//! sequence inside the opening write transaction; a database written by a
//! newer node is refused. Downgrades do not exist.
//!
//! Every step reads what it needs into memory before writing — a cursor is
//! only valid for the reads it was opened for.

use tracing::info;

use kestrel_store::{AccountInfo, StoreError};
use kestrel_types::{Account, BlockHash};

use crate::environment::LmdbStore;
use heed::RwTxn;

/// The schema version the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 11;

pub struct Migrator;

impl Migrator {
    /// Check the stored schema version and run any needed migrations under
    /// the open transaction.
    pub fn run(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
        let current = match store.meta.version_get(txn)? {
            None => {
                // Fresh database — start at the current schema.
                store.meta.version_put(txn, CURRENT_SCHEMA_VERSION)?;
                info!(version = CURRENT_SCHEMA_VERSION, "initialized fresh database");
                return Ok(());
            }
            Some(version) => version,
        };

        if current == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }
        if current > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::BadTransaction(format!(
                "database schema version {} is newer than supported version {}",
                current, CURRENT_SCHEMA_VERSION
            )));
        }

        for version in current..CURRENT_SCHEMA_VERSION {
            info!(from = version, to = version + 1, "running migration");
            run_step(store, txn, version)?;
            store.meta.version_put(txn, version + 1)?;
        }
        info!(version = CURRENT_SCHEMA_VERSION, "migration complete");
        Ok(())
    }
}

fn run_step(store: &LmdbStore, txn: &mut RwTxn, from: u32) -> Result<(), StoreError> {
    match from {
        1 => backfill_open_blocks(store, txn),
        2 => rebuild_representation(store, txn),
        3 => rekey_pending(store, txn),
        4 => populate_successors(store, txn),
        5 => denormalize_block_counts(store, txn),
        6 => {
            // Unchecked switched to dup-sort semantics; the table is a cache
            // and is simply rebuilt from live traffic.
            store.unchecked.clear(txn)
        }
        7 => backfill_sideband_balances(store, txn),
        8 => rebuild_checksum(store, txn),
        9 => {
            // Bare sequence numbers were replaced with full vote records;
            // the old values carry no recoverable block.
            store.votes.clear(txn)
        }
        10 => prune_state_frontiers(store, txn),
        other => Err(StoreError::BadTransaction(format!(
            "unknown migration step: {} -> {}",
            other,
            other + 1
        ))),
    }
}

/// Follow previous-links from `head` to the first block of the chain.
fn chain_walk(
    store: &LmdbStore,
    txn: &RwTxn,
    head: &BlockHash,
) -> Result<Vec<BlockHash>, StoreError> {
    let mut hashes = Vec::new();
    let mut cursor = *head;
    while !cursor.is_zero() {
        let (block, _) = store
            .blocks
            .get(txn, &cursor)?
            .ok_or_else(|| StoreError::Corrupted(format!("chain references missing block {cursor}")))?;
        hashes.push(cursor);
        cursor = block.previous();
    }
    Ok(hashes)
}

/// Walk back from `head` to the newest block that names a representative.
fn representative_of_chain(
    store: &LmdbStore,
    txn: &RwTxn,
    head: &BlockHash,
) -> Result<Option<Account>, StoreError> {
    let mut cursor = *head;
    while !cursor.is_zero() {
        let (block, _) = store
            .blocks
            .get(txn, &cursor)?
            .ok_or_else(|| StoreError::Corrupted(format!("chain references missing block {cursor}")))?;
        if let Some(representative) = block.representative() {
            return Ok(Some(representative));
        }
        cursor = block.previous();
    }
    Ok(None)
}

fn all_accounts(
    store: &LmdbStore,
    txn: &RwTxn,
) -> Result<Vec<(Account, AccountInfo)>, StoreError> {
    store.accounts.iter(txn)?.collect()
}

/// 1→2: account records gained the open-block pointer.
fn backfill_open_blocks(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
    let accounts = all_accounts(store, txn)?;
    for (account, mut info) in accounts {
        if !info.open_block.is_zero() {
            continue;
        }
        let chain = chain_walk(store, txn, &info.head)?;
        if let Some(open) = chain.last() {
            info.open_block = *open;
            store.accounts.put(txn, &account, &info)?;
        }
    }
    Ok(())
}

/// 2→3: the representation table is computed from chains instead of being
/// trusted from the old records.
fn rebuild_representation(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
    let accounts = all_accounts(store, txn)?;
    store.representation.clear(txn)?;
    for (_, info) in accounts {
        if let Some(representative) = representative_of_chain(store, txn, &info.head)? {
            store.representation.add(txn, &representative, info.balance)?;
        }
    }
    Ok(())
}

/// 3→4: pending was keyed by send hash alone with the destination inside
/// the value: `hash(32) → source(32) ‖ amount(16) ‖ destination(32)`.
fn rekey_pending(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
    use kestrel_types::{Amount, Epoch};

    let mut old_entries: Vec<(BlockHash, Account, Amount, Account)> = Vec::new();
    {
        let iter = store.pending.db.iter(txn).map_err(crate::map_heed)?;
        for entry in iter {
            let (key, value) = entry.map_err(crate::map_heed)?;
            if key.len() != 32 || value.len() != 80 {
                continue;
            }
            let hash = BlockHash::from_bytes(key.try_into().unwrap());
            let source = Account::from_bytes(value[0..32].try_into().unwrap());
            let amount = Amount::from_be_bytes(value[32..48].try_into().unwrap());
            let destination = Account::from_bytes(value[48..80].try_into().unwrap());
            old_entries.push((hash, source, amount, destination));
        }
    }
    for (hash, source, amount, destination) in old_entries {
        store
            .pending
            .db
            .delete(txn, hash.as_bytes())
            .map_err(crate::map_heed)?;
        store.pending.put(
            txn,
            &kestrel_store::PendingKey::new(destination, hash),
            &kestrel_store::PendingInfo::new(source, amount, Epoch::Epoch0),
        )?;
    }
    Ok(())
}

/// 4→5: sideband successor links were introduced.
fn populate_successors(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
    let accounts = all_accounts(store, txn)?;
    for (_, info) in accounts {
        let chain = chain_walk(store, txn, &info.head)?;
        // chain[0] is the head; each parent's successor is its child.
        for pair in chain.windows(2) {
            store.blocks.successor_set(txn, &pair[1], &pair[0])?;
        }
    }
    Ok(())
}

/// 5→6: block counts were denormalized into the account records.
fn denormalize_block_counts(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
    let accounts = all_accounts(store, txn)?;
    for (account, mut info) in accounts {
        let count = chain_walk(store, txn, &info.head)?.len() as u64;
        if info.block_count != count {
            info.block_count = count;
            store.accounts.put(txn, &account, &info)?;
        }
    }
    Ok(())
}

/// 7→8: sideband balances replaced the sparse block-info checkpoints.
fn backfill_sideband_balances(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
    let mut checkpoints = Vec::new();
    {
        let iter = store.blocks_info.db.iter(txn).map_err(crate::map_heed)?;
        for entry in iter {
            let (key, value) = entry.map_err(crate::map_heed)?;
            let key: [u8; 32] = key.try_into().map_err(|_| {
                StoreError::Corrupted("block info key has the wrong length".to_string())
            })?;
            checkpoints.push((
                BlockHash::from_bytes(key),
                kestrel_store::BlockInfo::from_bytes(value)?,
            ));
        }
    }
    for (hash, checkpoint) in &checkpoints {
        if let Some((block, mut sideband)) = store.blocks.get(txn, hash)? {
            if sideband.balance.is_zero() {
                sideband.balance = checkpoint.balance;
                sideband.account = checkpoint.account;
                store.blocks.put(txn, hash, &block, &sideband)?;
            }
        }
    }
    store.blocks_info.clear(txn)
}

/// 8→9: the whole-ledger checksum region is derived state; rebuild it.
fn rebuild_checksum(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
    let accounts = all_accounts(store, txn)?;
    store.checksum.clear(txn)?;
    let mut digest = [0u8; 32];
    for (_, info) in &accounts {
        for (slot, byte) in info.head.as_bytes().iter().enumerate() {
            digest[slot] ^= byte;
        }
    }
    store
        .checksum
        .put(txn, 0, 0, &BlockHash::from_bytes(digest))
}

/// 10→11: frontier entries for state-block heads are dropped — state blocks
/// carry the account in-band.
fn prune_state_frontiers(store: &LmdbStore, txn: &mut RwTxn) -> Result<(), StoreError> {
    use kestrel_blocks::BlockType;

    let mut doomed = Vec::new();
    {
        let entries: Vec<(BlockHash, Account)> =
            store.frontiers.iter(txn)?.collect::<Result<_, _>>()?;
        for (hash, _) in entries {
            match store.blocks.get(txn, &hash)? {
                Some((block, _)) if block.block_type() != BlockType::State => {}
                _ => doomed.push(hash),
            }
        }
    }
    for hash in doomed {
        store.frontiers.del(txn, &hash)?;
    }
    Ok(())
}
