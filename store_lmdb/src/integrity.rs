//! Offline consistency check over the whole store.
//!
//! Verifies the structural invariants the ledger maintains: successor
//! links, head balances, pending/send pairing and the representation sum.
//! Run by the daemon's `check` command before trusting a data directory.

use heed::RoTxn;

use kestrel_blocks::BlockType;
use kestrel_store::StoreError;
use kestrel_types::Amount;

use crate::environment::LmdbStore;

/// Findings from an integrity pass. Empty `errors` means the store is
/// consistent.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub accounts_checked: u64,
    pub blocks_checked: u64,
    pub pending_checked: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_consistent(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Walk every table and cross-check the ledger invariants.
pub fn check_integrity(store: &LmdbStore, txn: &RoTxn) -> Result<IntegrityReport, StoreError> {
    let mut report = IntegrityReport::default();

    // Chain invariants: previous exists and its successor points back.
    for block_type in [
        BlockType::Send,
        BlockType::Receive,
        BlockType::Open,
        BlockType::Change,
        BlockType::State,
    ] {
        for entry in store.blocks.iter_typed(txn, block_type)? {
            let (hash, block, _sideband) = entry?;
            report.blocks_checked += 1;
            let previous = block.previous();
            if previous.is_zero() {
                continue;
            }
            match store.blocks.get(txn, &previous)? {
                None => report
                    .errors
                    .push(format!("block {hash} references missing previous {previous}")),
                Some((_, previous_sideband)) => {
                    if previous_sideband.successor != hash {
                        report.errors.push(format!(
                            "block {previous} successor is {}, expected {hash}",
                            previous_sideband.successor
                        ));
                    }
                }
            }
        }
    }

    // Account invariants: head exists and its sideband balance matches the
    // account record.
    let mut balance_total = Amount::ZERO;
    for entry in store.accounts.iter(txn)? {
        let (account, info) = entry?;
        report.accounts_checked += 1;
        match store.blocks.get(txn, &info.head)? {
            None => report
                .errors
                .push(format!("account {account} head {} is missing", info.head)),
            Some((_, sideband)) => {
                if sideband.balance != info.balance {
                    report.errors.push(format!(
                        "account {account} balance {} disagrees with head sideband {}",
                        info.balance.number(),
                        sideband.balance.number()
                    ));
                }
            }
        }
        if store.blocks.get(txn, &info.open_block)?.is_none() {
            report
                .errors
                .push(format!("account {account} open block is missing"));
        }
        balance_total = balance_total
            .checked_add(info.balance)
            .ok_or_else(|| StoreError::Corrupted("account balances exceed supply".to_string()))?;
    }

    // Pending invariants: the send that created each receivable exists.
    for entry in store.pending.iter(txn)? {
        let (key, _info) = entry?;
        report.pending_checked += 1;
        if !store.blocks.exists(txn, &key.send_hash)? {
            report.errors.push(format!(
                "pending entry for {} references missing send {}",
                key.destination, key.send_hash
            ));
        }
    }

    // Weight invariant: representation sums to the opened balances.
    let mut weight_total = Amount::ZERO;
    for entry in store.representation.iter(txn)? {
        let (_, weight) = entry?;
        weight_total = weight_total
            .checked_add(weight)
            .ok_or_else(|| StoreError::Corrupted("representation exceeds supply".to_string()))?;
    }
    if weight_total != balance_total {
        report.errors.push(format!(
            "representation total {} disagrees with balance total {}",
            weight_total.number(),
            balance_total.number()
        ));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_blocks::{Block, StateBlock};
    use kestrel_store::{AccountInfo, BlockSideband};
    use kestrel_types::{Account, BlockHash, Epoch, Link, Signature};

    #[test]
    fn empty_store_is_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let txn = store.tx_begin_read().unwrap();
        let report = check_integrity(&store, &txn).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.blocks_checked, 0);
    }

    #[test]
    fn mismatched_weight_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path()).unwrap();
        let mut txn = store.tx_begin_write().unwrap();

        let account = Account::from_bytes([1u8; 32]);
        let block = Block::State(StateBlock {
            account,
            previous: BlockHash::ZERO,
            representative: account,
            balance: Amount::raw(100),
            link: Link::from_bytes([2u8; 32]),
            signature: Signature::ZERO,
            work: 0,
        });
        let hash = block.hash();
        store
            .blocks
            .put(
                &mut txn,
                &hash,
                &block,
                &BlockSideband {
                    successor: BlockHash::ZERO,
                    account,
                    height: 1,
                    timestamp: 0,
                    balance: Amount::raw(100),
                    epoch: Epoch::Epoch0,
                },
            )
            .unwrap();
        store
            .accounts
            .put(
                &mut txn,
                &account,
                &AccountInfo {
                    head: hash,
                    open_block: hash,
                    rep_block: hash,
                    balance: Amount::raw(100),
                    modified: 0,
                    block_count: 1,
                    epoch: Epoch::Epoch0,
                },
            )
            .unwrap();
        // Representation deliberately left at zero.
        txn.commit().unwrap();

        let txn = store.tx_begin_read().unwrap();
        let report = check_integrity(&store, &txn).unwrap();
        assert!(!report.is_consistent());
        assert!(report.errors.iter().any(|e| e.contains("representation")));
    }
}
