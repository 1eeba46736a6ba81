//! The block processor: the single writer between the network and the
//! ledger.
//!
//! Blocks are admitted (proof-of-work screened), offered to the ledger and
//! routed by result: progress drains dependents from the unchecked table
//! and processes them in arrival order; gaps park the block under its
//! missing dependency; forks start elections. Work and signature failures
//! are silent drops counted in [`ProcessorStats`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use heed::RwTxn;
use tracing::{debug, trace};

use kestrel_blocks::Block;
use kestrel_consensus::ActiveElections;
use kestrel_ledger::{Ledger, ProcessResult, ProcessReturn};
use kestrel_store::{StoreError, UncheckedInfo};
use kestrel_types::{BlockHash, Timestamp};
use kestrel_work::validate_work;

/// Silent-drop and routing counters. The only operator-visible trace of
/// cryptographic rejects.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    pub progress: AtomicU64,
    pub old: AtomicU64,
    pub gaps: AtomicU64,
    pub forks: AtomicU64,
    pub work_dropped: AtomicU64,
    pub bad_signature: AtomicU64,
    pub other_rejects: AtomicU64,
}

pub struct BlockProcessor {
    ledger: Arc<Ledger>,
    elections: Arc<ActiveElections>,
    pub stats: ProcessorStats,
}

impl BlockProcessor {
    pub fn new(ledger: Arc<Ledger>, elections: Arc<ActiveElections>) -> Self {
        Self {
            ledger,
            elections,
            stats: ProcessorStats::default(),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn elections(&self) -> &Arc<ActiveElections> {
        &self.elections
    }

    /// Admit and process one block plus everything it unblocks, under the
    /// caller's write transaction. Returns the result for the offered block
    /// itself, or `None` when it was dropped at admission.
    pub fn process(
        &self,
        txn: &mut RwTxn,
        block: Block,
        now: Timestamp,
    ) -> Result<Option<ProcessReturn>, StoreError> {
        if !self.admit(&block) {
            return Ok(None);
        }
        let first = self.process_admitted(txn, &block, now)?;
        // Applying a block may free dependents; drain them breadth-first in
        // arrival order.
        if first.code == ProcessResult::Progress {
            let mut queue: VecDeque<BlockHash> = VecDeque::new();
            queue.push_back(block.hash());
            while let Some(parent) = queue.pop_front() {
                for waiting in self.ledger.store.unchecked.take(txn, &parent)? {
                    let result = self.process_admitted(txn, &waiting.block, now)?;
                    if result.code == ProcessResult::Progress {
                        queue.push_back(waiting.block.hash());
                    }
                }
            }
        }
        Ok(Some(first))
    }

    /// The ingress screen: proof-of-work over the root against the most
    /// permissive applicable threshold. Failures are dropped without a
    /// result, visible only as a counter.
    fn admit(&self, block: &Block) -> bool {
        let threshold = self.ledger.constants.work.admission();
        if !validate_work(&block.root(), block.work(), threshold) {
            self.stats.work_dropped.fetch_add(1, Ordering::Relaxed);
            trace!(hash = %block.hash(), "dropped block with insufficient work");
            return false;
        }
        true
    }

    fn process_admitted(
        &self,
        txn: &mut RwTxn,
        block: &Block,
        now: Timestamp,
    ) -> Result<ProcessReturn, StoreError> {
        let result = self.ledger.process(txn, block)?;
        match result.code {
            ProcessResult::Progress => {
                self.stats.progress.fetch_add(1, Ordering::Relaxed);
            }
            ProcessResult::Old => {
                self.stats.old.fetch_add(1, Ordering::Relaxed);
            }
            ProcessResult::GapPrevious => {
                self.stats.gaps.fetch_add(1, Ordering::Relaxed);
                self.ledger.store.unchecked.put(
                    txn,
                    &block.previous(),
                    &UncheckedInfo::new(block.clone(), now.as_secs()),
                )?;
                debug!(hash = %block.hash(), "parked under missing previous");
            }
            ProcessResult::GapSource => {
                self.stats.gaps.fetch_add(1, Ordering::Relaxed);
                let dependency = self.gap_source_dependency(block);
                self.ledger.store.unchecked.put(
                    txn,
                    &dependency,
                    &UncheckedInfo::new(block.clone(), now.as_secs()),
                )?;
                debug!(hash = %block.hash(), "parked under missing source");
            }
            ProcessResult::Fork => {
                self.stats.forks.fetch_add(1, Ordering::Relaxed);
                if let Some(stored) = self.fork_counterpart(txn, block)? {
                    self.elections.start(stored, now);
                }
                self.elections.start(block.clone(), now);
                debug!(hash = %block.hash(), root = %block.root(), "fork; election running");
            }
            ProcessResult::BadSignature => {
                self.stats.bad_signature.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.stats.other_rejects.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(result)
    }

    /// The hash a gap-source block is waiting for.
    fn gap_source_dependency(&self, block: &Block) -> BlockHash {
        let source = block.source();
        if !source.is_zero() {
            return source;
        }
        // A state receive: the link names the source. (An unopened-account
        // state block with a zero link also lands here; its dependency is
        // unknowable, so it parks under its own root.)
        match block.link_field() {
            Some(link) if !link.is_zero() => link.as_block_hash(),
            _ => BlockHash::from_bytes(*block.root().as_bytes()),
        }
    }

    /// The block currently occupying the slot a fork contends for.
    fn fork_counterpart(
        &self,
        txn: &heed::RoTxn,
        block: &Block,
    ) -> Result<Option<Block>, StoreError> {
        let previous = block.previous();
        let stored_hash = if previous.is_zero() {
            // Open fork: the stored open block of the account.
            let account = block
                .account_field()
                .expect("blocks without previous carry their account");
            match self.ledger.store.accounts.get(txn, &account)? {
                Some(info) => info.open_block,
                None => return Ok(None),
            }
        } else {
            match self.ledger.store.blocks.successor(txn, &previous)? {
                Some(successor) if !successor.is_zero() => successor,
                _ => return Ok(None),
            }
        };
        Ok(self
            .ledger
            .store
            .blocks
            .get(txn, &stored_hash)?
            .map(|(stored, _)| stored))
    }

    /// Drop unchecked entries older than the cutoff.
    pub fn sweep_unchecked(
        &self,
        txn: &mut RwTxn,
        cutoff_secs: u64,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        let cutoff = now.as_secs().saturating_sub(cutoff_secs);
        self.ledger.store.unchecked.sweep(txn, cutoff)
    }
}
