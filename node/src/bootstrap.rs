//! Bootstrap request/response shaping, independent of the transport.
//!
//! A catching-up peer asks for frontiers, diffs them against its own
//! ledger, then pulls the divergent chains in bulk. The functions here do
//! the shaping; `sync` moves the bytes.

use heed::RoTxn;

use kestrel_blocks::Block;
use kestrel_ledger::Ledger;
use kestrel_store::StoreError;
use kestrel_types::{Account, BlockHash, Timestamp};

/// One reconciliation unit produced by a frontier diff: pull the remote
/// chain from its head back to (and including) our own, zero when we have
/// nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub account: Account,
    pub start: BlockHash,
    pub end: BlockHash,
}

/// Why a bulk request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkRefused {
    /// `start` is not a stored block.
    UnknownStart,
    /// `start` and `end` belong to different accounts.
    ForeignEnd,
}

/// Serve a frontier request: `(account, head)` pairs in account order,
/// starting at `start`, skipping accounts untouched for more than `age`
/// seconds, up to `count` entries.
pub fn serve_frontiers(
    ledger: &Ledger,
    txn: &RoTxn,
    start: Account,
    age: u32,
    count: u32,
    now: Timestamp,
) -> Result<Vec<(Account, BlockHash)>, StoreError> {
    let mut frontiers = Vec::new();
    for entry in ledger.store.accounts.iter_from(txn, &start)? {
        if frontiers.len() as u32 >= count {
            break;
        }
        let (account, info) = entry?;
        let idle = now.as_secs().saturating_sub(info.modified);
        if idle > age as u64 {
            continue;
        }
        frontiers.push((account, info.head));
    }
    Ok(frontiers)
}

/// Serve a bulk request: walk the chain containing `start` from newest
/// toward oldest, until `end` has been emitted or `count` blocks are out.
pub fn serve_bulk(
    ledger: &Ledger,
    txn: &RoTxn,
    start: BlockHash,
    end: BlockHash,
    count: u32,
) -> Result<Result<Vec<Block>, BulkRefused>, StoreError> {
    let Some(start_account) = ledger.account(txn, &start)? else {
        return Ok(Err(BulkRefused::UnknownStart));
    };
    if !end.is_zero() {
        match ledger.account(txn, &end)? {
            Some(end_account) if end_account == start_account => {}
            _ => return Ok(Err(BulkRefused::ForeignEnd)),
        }
    }
    let mut blocks = Vec::new();
    let mut cursor = start;
    while !cursor.is_zero() && (blocks.len() as u32) < count {
        let Some((block, _)) = ledger.store.blocks.get(txn, &cursor)? else {
            break;
        };
        let previous = block.previous();
        blocks.push(block);
        if cursor == end {
            break;
        }
        cursor = previous;
    }
    Ok(Ok(blocks))
}

/// Diff remote frontiers against the local ledger, producing one pull per
/// divergent or missing account.
pub fn compare_frontiers(
    ledger: &Ledger,
    txn: &RoTxn,
    remote: &[(Account, BlockHash)],
) -> Result<Vec<PullRequest>, StoreError> {
    let mut pulls = Vec::new();
    for (account, remote_head) in remote {
        match ledger.latest(txn, account)? {
            Some(local_head) if local_head == *remote_head => {}
            Some(local_head) => pulls.push(PullRequest {
                account: *account,
                start: *remote_head,
                end: local_head,
            }),
            None => pulls.push(PullRequest {
                account: *account,
                start: *remote_head,
                end: BlockHash::ZERO,
            }),
        }
    }
    Ok(pulls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_blocks::builder::send_block;
    use kestrel_ledger::{dev_genesis_key, LedgerConstants};
    use kestrel_store_lmdb::LmdbStore;
    use kestrel_types::Amount;
    use std::sync::Arc;

    fn setup() -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LmdbStore::open(dir.path()).unwrap());
        let ledger = Ledger::new(store, LedgerConstants::dev());
        let mut txn = ledger.store.tx_begin_write().unwrap();
        ledger.initialize(&mut txn).unwrap();
        txn.commit().unwrap();
        (dir, ledger)
    }

    fn extend_genesis(ledger: &Ledger, chain_len: u8) -> Vec<Block> {
        let keys = dev_genesis_key();
        let mut txn = ledger.store.tx_begin_write().unwrap();
        let mut head = ledger.latest(&txn, &keys.account()).unwrap().unwrap();
        let mut chain = Vec::new();
        for step in 0..chain_len {
            let send = send_block(
                head,
                Account::from_bytes([step + 1; 32]),
                Amount::raw(u128::MAX - (step as u128 + 1)),
                &keys,
                0,
            );
            assert_eq!(
                ledger.process(&mut txn, &send).unwrap().code,
                kestrel_ledger::ProcessResult::Progress
            );
            head = send.hash();
            chain.push(send);
        }
        txn.commit().unwrap();
        chain
    }

    #[test]
    fn frontier_serving_is_paged_and_age_filtered() {
        let (_dir, ledger) = setup();
        extend_genesis(&ledger, 2);
        let txn = ledger.store.tx_begin_read().unwrap();
        let genesis = dev_genesis_key().account();

        let frontiers =
            serve_frontiers(&ledger, &txn, Account::ZERO, u32::MAX, 100, Timestamp::now())
                .unwrap();
        assert_eq!(frontiers.len(), 1);
        assert_eq!(frontiers[0].0, genesis);

        // Zero count yields nothing; zero age filters the idle account out
        // only when the clock has moved past its last modification.
        assert!(
            serve_frontiers(&ledger, &txn, Account::ZERO, u32::MAX, 0, Timestamp::now())
                .unwrap()
                .is_empty()
        );
        let future = Timestamp::new(Timestamp::now().as_secs() + 10_000);
        assert!(
            serve_frontiers(&ledger, &txn, Account::ZERO, 60, 100, future)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn bulk_serving_walks_newest_to_oldest() {
        let (_dir, ledger) = setup();
        let chain = extend_genesis(&ledger, 3);
        let txn = ledger.store.tx_begin_read().unwrap();
        let genesis_hash = ledger.constants.genesis.hash();

        let blocks = serve_bulk(&ledger, &txn, chain[2].hash(), BlockHash::ZERO, 100)
            .unwrap()
            .unwrap();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].hash(), chain[2].hash());
        assert_eq!(blocks[3].hash(), genesis_hash);

        // `end` is inclusive and stops the walk.
        let blocks = serve_bulk(&ledger, &txn, chain[2].hash(), chain[1].hash(), 100)
            .unwrap()
            .unwrap();
        assert_eq!(blocks.len(), 2);

        // Count truncates.
        let blocks = serve_bulk(&ledger, &txn, chain[2].hash(), BlockHash::ZERO, 1)
            .unwrap()
            .unwrap();
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn bulk_refuses_foreign_end_and_unknown_start() {
        let (_dir, ledger) = setup();
        let chain = extend_genesis(&ledger, 1);
        let txn = ledger.store.tx_begin_read().unwrap();

        assert_eq!(
            serve_bulk(
                &ledger,
                &txn,
                BlockHash::from_bytes([0xEE; 32]),
                BlockHash::ZERO,
                10
            )
            .unwrap(),
            Err(BulkRefused::UnknownStart)
        );
        // `end` on a chain that does not contain `start`.
        assert_eq!(
            serve_bulk(
                &ledger,
                &txn,
                chain[0].hash(),
                BlockHash::from_bytes([0xEE; 32]),
                10
            )
            .unwrap(),
            Err(BulkRefused::ForeignEnd)
        );
    }

    #[test]
    fn frontier_diff_produces_pulls() {
        let (_dir, ledger) = setup();
        let txn = ledger.store.tx_begin_read().unwrap();
        let genesis = dev_genesis_key().account();
        let local_head = ledger.latest(&txn, &genesis).unwrap().unwrap();

        let ahead = BlockHash::from_bytes([0x99; 32]);
        let unknown_account = Account::from_bytes([0x44; 32]);
        let remote = vec![
            (genesis, local_head),
            (genesis, ahead),
            (unknown_account, ahead),
        ];
        let pulls = compare_frontiers(&ledger, &txn, &remote).unwrap();
        assert_eq!(pulls.len(), 2);
        assert_eq!(
            pulls[0],
            PullRequest {
                account: genesis,
                start: ahead,
                end: local_head,
            }
        );
        assert_eq!(
            pulls[1],
            PullRequest {
                account: unknown_account,
                start: ahead,
                end: BlockHash::ZERO,
            }
        );
    }
}
