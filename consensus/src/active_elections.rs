//! The election container: one election per contested root.
//!
//! A single mutex guards the map and, transitively, each election's state;
//! vote processing is serialized per election while elections stay
//! independent of each other. Confirmed elections linger for a grace period
//! to absorb late votes; unconfirmed ones past their lifetime are dropped
//! and their candidates handed back for re-queueing.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use kestrel_blocks::Block;
use kestrel_store::Vote;
use kestrel_types::{Amount, Root, Timestamp};

use crate::election::{Election, VoteResult};

#[derive(Clone, Copy, Debug)]
pub struct ElectionConfig {
    /// How long a confirmed election keeps absorbing late votes.
    pub confirmed_grace_secs: u64,
    /// Maximum lifetime of an unconfirmed election.
    pub max_lifetime_secs: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            confirmed_grace_secs: 10,
            max_lifetime_secs: 300,
        }
    }
}

/// What happened as a result of a container call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElectionEvent {
    /// A new election was started for the block's root.
    Started,
    /// The block joined an existing election as a fork candidate.
    Joined,
    /// The vote failed signature verification and was dropped.
    Invalid,
    /// No election exists for the vote's root.
    NoElection,
    /// Vote absorbed without changing the outcome.
    Observed,
    /// The leading block changed; the ledger should switch forks.
    WinnerChanged(Block),
    /// A threshold was reached for the first time.
    Confirmed(Block),
}

pub struct ActiveElections {
    roots: Mutex<HashMap<Root, Election>>,
    config: ElectionConfig,
}

impl ActiveElections {
    pub fn new(config: ElectionConfig) -> Self {
        Self {
            roots: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Begin (or join) an election for `block`'s root.
    pub fn start(&self, block: Block, now: Timestamp) -> ElectionEvent {
        let mut roots = self.roots.lock().expect("election map poisoned");
        let root = block.root();
        match roots.get_mut(&root) {
            Some(election) => {
                election.observe(block);
                ElectionEvent::Joined
            }
            None => {
                debug!(%root, "election started");
                roots.insert(root, Election::new(block, now));
                ElectionEvent::Started
            }
        }
    }

    /// Feed a signed vote. `weight` is the voter's ledger weight, `online`
    /// the total online weight used for thresholds.
    pub fn vote(
        &self,
        vote: &Vote,
        weight: Amount,
        online: Amount,
        now: Timestamp,
    ) -> ElectionEvent {
        if !vote.validate() {
            return ElectionEvent::Invalid;
        }
        let mut roots = self.roots.lock().expect("election map poisoned");
        let root = vote.block.root();
        let Some(election) = roots.get_mut(&root) else {
            return ElectionEvent::NoElection;
        };
        match election.vote(vote.voter, vote.sequence, vote.block.clone(), weight, now) {
            VoteResult::Replay => return ElectionEvent::Observed,
            VoteResult::Accepted | VoteResult::Updated => {}
        }
        if let Some(winner) = election.update_winner(online) {
            debug!(%root, winner = %winner.hash(), "election leader changed");
            return ElectionEvent::WinnerChanged(winner);
        }
        if let Some(winner) = election.try_confirm(online, now) {
            debug!(%root, winner = %winner.hash(), "election confirmed");
            return ElectionEvent::Confirmed(winner);
        }
        ElectionEvent::Observed
    }

    pub fn exists(&self, root: &Root) -> bool {
        self.roots
            .lock()
            .expect("election map poisoned")
            .contains_key(root)
    }

    pub fn len(&self) -> usize {
        self.roots.lock().expect("election map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn winner(&self, root: &Root) -> Option<Block> {
        self.roots
            .lock()
            .expect("election map poisoned")
            .get(root)
            .map(|election| election.winner().clone())
    }

    pub fn confirmed(&self, root: &Root) -> bool {
        self.roots
            .lock()
            .expect("election map poisoned")
            .get(root)
            .map(|election| election.confirmed())
            .unwrap_or(false)
    }

    /// Elections that have heard nothing for `interval_secs` and want
    /// another confirm-request round. Bumps each election's round counter
    /// and stamps it so the next round waits a full interval again.
    pub fn confirm_requests(
        &self,
        interval_secs: u64,
        now: Timestamp,
    ) -> Vec<(Root, Block, u64)> {
        let mut roots = self.roots.lock().expect("election map poisoned");
        let mut due = Vec::new();
        for (root, election) in roots.iter_mut() {
            if election.confirmed() {
                continue;
            }
            if election.last_vote_time.has_expired(interval_secs, now) {
                let round = election.next_round();
                election.last_vote_time = now;
                due.push((*root, election.winner().clone(), round));
            }
        }
        due
    }

    /// Drop confirmed elections past their grace period and unconfirmed
    /// ones past their lifetime. Returns the candidates of expired
    /// (never-confirmed) elections so the caller can park them as
    /// unchecked again.
    pub fn prune(&self, now: Timestamp) -> Vec<Block> {
        let mut roots = self.roots.lock().expect("election map poisoned");
        let mut expired_blocks = Vec::new();
        roots.retain(|root, election| {
            if election.confirmed() {
                let done = election
                    .confirmed_at
                    .map(|at| at.has_expired(self.config.confirmed_grace_secs, now))
                    .unwrap_or(false);
                if done {
                    debug!(%root, "confirmed election retired");
                }
                return !done;
            }
            if election
                .created_at
                .has_expired(self.config.max_lifetime_secs, now)
            {
                debug!(%root, "unconfirmed election expired");
                expired_blocks.extend(election.candidates().cloned());
                return false;
            }
            true
        });
        expired_blocks
    }
}
