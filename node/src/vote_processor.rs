//! Vote ingestion: verify, weigh, feed the election, persist, and act on
//! the outcome.
//!
//! A vote that changes an election's winner (or confirms one) is carried
//! into the ledger: if the decided block differs from what is stored at
//! that chain position, the loser is rolled back and the winner applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use kestrel_blocks::Block;
use kestrel_consensus::{ActiveElections, ElectionEvent, OnlineReps};
use kestrel_crypto::KeyPair;
use kestrel_ledger::{Ledger, ProcessResult};
use kestrel_store::{StoreError, Vote};
use kestrel_types::{Amount, Timestamp};

/// Callback invoked with every decided block, so block sources (wallets)
/// can learn when something they authored won or was superseded.
pub type DecisionObserver = Box<dyn Fn(&Block) + Send + Sync>;

pub struct VoteProcessor {
    ledger: Arc<Ledger>,
    elections: Arc<ActiveElections>,
    online: Mutex<OnlineReps>,
    observers: Mutex<Vec<DecisionObserver>>,
    /// Balance below which a voter does not count as a representative.
    vote_minimum: Amount,
    /// Signature failures, visible only as a counter.
    pub invalid_votes: AtomicU64,
    pub below_minimum: AtomicU64,
}

impl VoteProcessor {
    pub fn new(
        ledger: Arc<Ledger>,
        elections: Arc<ActiveElections>,
        vote_minimum: Amount,
    ) -> Self {
        Self {
            ledger,
            elections,
            online: Mutex::new(OnlineReps::default()),
            observers: Mutex::new(Vec::new()),
            vote_minimum,
            invalid_votes: AtomicU64::new(0),
            below_minimum: AtomicU64::new(0),
        }
    }

    /// Register for election decisions.
    pub fn add_decision_observer(&self, observer: DecisionObserver) {
        self.observers
            .lock()
            .expect("observer list poisoned")
            .push(observer);
    }

    /// Process one incoming vote end to end.
    pub fn process(&self, vote: &Vote, now: Timestamp) -> Result<ElectionEvent, StoreError> {
        if !vote.validate() {
            self.invalid_votes.fetch_add(1, Ordering::Relaxed);
            return Ok(ElectionEvent::Invalid);
        }

        let (weight, online_weight) = {
            let txn = self.ledger.store.tx_begin_read()?;
            let weight = self.ledger.weight(&txn, &vote.voter)?;
            if weight < self.vote_minimum {
                self.below_minimum.fetch_add(1, Ordering::Relaxed);
                return Ok(ElectionEvent::Observed);
            }
            let mut online = self.online.lock().expect("online reps poisoned");
            online.observe(vote.voter, weight, now);
            (weight, online.online_weight(now))
        };

        // Buffer the vote; the writer's next flush persists it with the
        // per-voter monotone sequence intact.
        self.ledger.store.votes.put_buffered(vote.clone());

        let event = self.elections.vote(vote, weight, online_weight, now);
        match &event {
            ElectionEvent::WinnerChanged(winner) | ElectionEvent::Confirmed(winner) => {
                self.apply_decision(winner)?;
                for observer in self.observers.lock().expect("observer list poisoned").iter() {
                    observer(winner);
                }
            }
            _ => {}
        }
        Ok(event)
    }

    /// Make the store agree with an election decision: roll back whatever
    /// occupies the winner's slot and apply the winner.
    fn apply_decision(&self, winner: &Block) -> Result<(), StoreError> {
        let mut txn = self.ledger.store.tx_begin_write()?;
        if self.ledger.block_exists(&txn, &winner.hash())? {
            return Ok(());
        }
        let previous = winner.previous();
        let stored = if previous.is_zero() {
            let account = winner
                .account_field()
                .expect("rootless blocks carry their account");
            self.ledger
                .store
                .accounts
                .get(&txn, &account)?
                .map(|info| info.open_block)
        } else {
            self.ledger
                .store
                .blocks
                .successor(&txn, &previous)?
                .filter(|successor| !successor.is_zero())
        };
        if let Some(loser) = stored {
            let undone = self.ledger.rollback(&mut txn, &loser)?;
            info!(loser = %loser, winner = %winner.hash(), undone = undone.len(), "switched forks");
        }
        let result = self.ledger.process(&mut txn, winner)?;
        if result.code != ProcessResult::Progress && result.code != ProcessResult::Old {
            warn!(
                winner = %winner.hash(),
                result = result.code.as_str(),
                "confirmed block did not apply"
            );
        }
        self.ledger.store.flush(&mut txn)?;
        txn.commit().map_err(kestrel_store_lmdb::map_heed)?;
        debug!(winner = %winner.hash(), "election decision applied");
        Ok(())
    }

    /// Mint this node's own vote for a block, continuing the voter's
    /// persisted sequence. Used when voting is enabled and a wallet holds
    /// a representative key; the caller broadcasts the resulting
    /// confirm-ack.
    pub fn generate_vote(&self, keys: &KeyPair, block: Block) -> Result<Vote, StoreError> {
        let sequence = {
            let txn = self.ledger.store.tx_begin_read()?;
            self.ledger
                .store
                .votes
                .get(&txn, &keys.account())?
                .map(|vote| vote.sequence + 1)
                .unwrap_or(1)
        };
        let vote = Vote::new(keys, sequence, block);
        self.ledger.store.votes.put_buffered(vote.clone());
        Ok(vote)
    }

    /// Current online voting weight (S).
    pub fn online_weight(&self, now: Timestamp) -> Amount {
        self.online
            .lock()
            .expect("online reps poisoned")
            .online_weight(now)
    }
}
