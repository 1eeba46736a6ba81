//! A single election over one chain position.

use std::collections::HashMap;

use kestrel_blocks::Block;
use kestrel_types::{Account, Amount, BlockHash, Root, Timestamp};

/// Outcome of feeding one vote into an election.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteResult {
    /// First vote from this representative.
    Accepted,
    /// Replaced the representative's earlier vote.
    Updated,
    /// Sequence not newer than the stored one; dropped.
    Replay,
}

/// A representative's latest standing in the election.
#[derive(Clone, Debug)]
struct VoteEntry {
    sequence: u64,
    block: BlockHash,
    weight: Amount,
}

/// One contested chain position.
///
/// `last_winner` is the currently leading block; `confirmed` latches once a
/// threshold is met. The election-local `sequence` counts outgoing
/// confirm-request rounds for this root.
pub struct Election {
    pub root: Root,
    last_winner: Block,
    pub sequence: u64,
    rep_votes: HashMap<Account, VoteEntry>,
    /// Candidate blocks observed for this root, by hash.
    blocks: HashMap<BlockHash, Block>,
    pub last_vote_time: Timestamp,
    pub created_at: Timestamp,
    pub confirmed_at: Option<Timestamp>,
    confirmed: bool,
}

impl Election {
    pub fn new(block: Block, now: Timestamp) -> Self {
        let root = block.root();
        let mut blocks = HashMap::new();
        blocks.insert(block.hash(), block.clone());
        Self {
            root,
            last_winner: block,
            sequence: 0,
            rep_votes: HashMap::new(),
            blocks,
            last_vote_time: now,
            created_at: now,
            confirmed_at: None,
            confirmed: false,
        }
    }

    /// Add a fork candidate for this root.
    pub fn observe(&mut self, block: Block) {
        debug_assert_eq!(block.root(), self.root);
        self.blocks.entry(block.hash()).or_insert(block);
    }

    /// Record a representative's vote. Stale sequences are dropped; a newer
    /// sequence replaces the representative's previous choice entirely.
    pub fn vote(
        &mut self,
        voter: Account,
        sequence: u64,
        block: Block,
        weight: Amount,
        now: Timestamp,
    ) -> VoteResult {
        if let Some(existing) = self.rep_votes.get(&voter) {
            if existing.sequence >= sequence {
                return VoteResult::Replay;
            }
        }
        let hash = block.hash();
        self.observe(block);
        let updated = self
            .rep_votes
            .insert(
                voter,
                VoteEntry {
                    sequence,
                    block: hash,
                    weight,
                },
            )
            .is_some();
        self.last_vote_time = now;
        if updated {
            VoteResult::Updated
        } else {
            VoteResult::Accepted
        }
    }

    /// Per-candidate weight totals, heaviest first.
    pub fn tally(&self) -> Vec<(Amount, BlockHash)> {
        let mut totals: HashMap<BlockHash, Amount> = HashMap::new();
        for entry in self.rep_votes.values() {
            let slot = totals.entry(entry.block).or_insert(Amount::ZERO);
            *slot = slot.checked_add(entry.weight).unwrap_or(Amount::MAX);
        }
        let mut tally: Vec<(Amount, BlockHash)> =
            totals.into_iter().map(|(hash, weight)| (weight, hash)).collect();
        tally.sort_by(|a, b| b.0.cmp(&a.0));
        tally
    }

    fn tally_of(&self, hash: &BlockHash) -> Amount {
        self.tally()
            .into_iter()
            .find(|(_, candidate)| candidate == hash)
            .map(|(weight, _)| weight)
            .unwrap_or(Amount::ZERO)
    }

    fn uncontested_threshold(&self, online: Amount) -> Amount {
        Amount::raw(online.number() / 8)
    }

    fn contested_threshold(&self, online: Amount) -> Amount {
        Amount::raw(online.number() / 2)
    }

    /// What a challenger must reach to displace the current winner.
    fn flip_threshold(&self, online: Amount) -> Amount {
        let winner_weight = self.tally_of(&self.last_winner.hash());
        winner_weight
            .checked_add(self.uncontested_threshold(online))
            .unwrap_or(Amount::MAX)
    }

    /// Re-evaluate the leader with flip hysteresis. Returns the new winner
    /// when it changed.
    pub fn update_winner(&mut self, online: Amount) -> Option<Block> {
        let (leader_weight, leader_hash) = self.tally().into_iter().next()?;
        if leader_hash == self.last_winner.hash() {
            return None;
        }
        if leader_weight < self.flip_threshold(online) {
            return None;
        }
        let block = self.blocks.get(&leader_hash)?.clone();
        self.last_winner = block.clone();
        Some(block)
    }

    /// Latch confirmation once the winner's tally clears the applicable
    /// threshold: an eighth of the online weight while uncontested, half
    /// once two or more candidates have been observed.
    pub fn try_confirm(&mut self, online: Amount, now: Timestamp) -> Option<Block> {
        if self.confirmed {
            return None;
        }
        let winner_weight = self.tally_of(&self.last_winner.hash());
        let threshold = if self.blocks.len() > 1 {
            self.contested_threshold(online)
        } else {
            self.uncontested_threshold(online)
        };
        if winner_weight >= threshold && !winner_weight.is_zero() {
            self.confirmed = true;
            self.confirmed_at = Some(now);
            return Some(self.last_winner.clone());
        }
        None
    }

    /// Bump and return the round counter for the next outgoing confirm
    /// request for this root.
    pub fn next_round(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn winner(&self) -> &Block {
        &self.last_winner
    }

    /// Every candidate observed for this root.
    pub fn candidates(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_blocks::{SendBlock, StateBlockBuilder};
    use kestrel_types::{Link, Signature};

    fn block(tag: u8) -> Block {
        Block::Send(SendBlock {
            previous: BlockHash::from_bytes([0xAA; 32]),
            destination: Account::from_bytes([tag; 32]),
            balance: Amount::raw(tag as u128),
            signature: Signature::ZERO,
            work: 0,
        })
    }

    fn voter(tag: u8) -> Account {
        Account::from_bytes([tag; 32])
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    const ONLINE: Amount = Amount::raw(8000);

    #[test]
    fn fork_candidates_share_a_root() {
        let a = block(1);
        let b = block(2);
        assert_eq!(a.root(), b.root());
        let mut election = Election::new(a.clone(), ts(0));
        election.observe(b);
        assert_eq!(election.candidates().count(), 2);
        assert_eq!(election.winner().hash(), a.hash());
    }

    #[test]
    fn uncontested_eighth_confirms() {
        let a = block(1);
        let mut election = Election::new(a.clone(), ts(0));
        election.vote(voter(1), 1, a.clone(), Amount::raw(999), ts(1));
        assert!(election.try_confirm(ONLINE, ts(1)).is_none());
        election.vote(voter(2), 1, a.clone(), Amount::raw(1), ts(2));
        let winner = election.try_confirm(ONLINE, ts(2)).expect("1000 >= 8000/8");
        assert_eq!(winner.hash(), a.hash());
        assert!(election.confirmed());
        // Latched: no second confirmation event.
        assert!(election.try_confirm(ONLINE, ts(3)).is_none());
    }

    #[test]
    fn contested_needs_half() {
        let a = block(1);
        let b = block(2);
        let mut election = Election::new(a.clone(), ts(0));
        election.observe(b.clone());
        election.vote(voter(1), 1, a.clone(), Amount::raw(1500), ts(1));
        // 1500 >= 1000 (uncontested) but the election is contested.
        assert!(election.try_confirm(ONLINE, ts(1)).is_none());
        election.vote(voter(2), 1, a.clone(), Amount::raw(2500), ts(2));
        let winner = election.try_confirm(ONLINE, ts(2)).expect("4000 >= 8000/2");
        assert_eq!(winner.hash(), a.hash());
    }

    #[test]
    fn replayed_and_stale_sequences_dropped() {
        let a = block(1);
        let b = block(2);
        let mut election = Election::new(a.clone(), ts(0));
        assert_eq!(
            election.vote(voter(1), 5, a.clone(), Amount::raw(100), ts(1)),
            VoteResult::Accepted
        );
        assert_eq!(
            election.vote(voter(1), 5, b.clone(), Amount::raw(100), ts(2)),
            VoteResult::Replay
        );
        assert_eq!(
            election.vote(voter(1), 4, b.clone(), Amount::raw(100), ts(3)),
            VoteResult::Replay
        );
        assert_eq!(
            election.vote(voter(1), 6, b, Amount::raw(100), ts(4)),
            VoteResult::Updated
        );
        // Only the latest submission counts.
        assert_eq!(election.tally().len(), 1);
    }

    #[test]
    fn revote_moves_weight_between_candidates() {
        let a = block(1);
        let b = block(2);
        let mut election = Election::new(a.clone(), ts(0));
        election.vote(voter(1), 1, a.clone(), Amount::raw(300), ts(1));
        election.vote(voter(1), 2, b.clone(), Amount::raw(300), ts(2));
        let tally = election.tally();
        assert_eq!(tally.len(), 1);
        assert_eq!(tally[0], (Amount::raw(300), b.hash()));
    }

    #[test]
    fn flip_requires_hysteresis_margin() {
        let a = block(1);
        let b = block(2);
        let mut election = Election::new(a.clone(), ts(0));
        election.observe(b.clone());
        election.vote(voter(1), 1, a.clone(), Amount::raw(500), ts(1));
        election.update_winner(ONLINE);
        assert_eq!(election.winner().hash(), a.hash());

        // 1400 < 500 + 1000: stays.
        election.vote(voter(2), 1, b.clone(), Amount::raw(1400), ts(2));
        assert!(election.update_winner(ONLINE).is_none());
        assert_eq!(election.winner().hash(), a.hash());

        // 1500 >= 500 + 1000: flips.
        election.vote(voter(3), 1, b.clone(), Amount::raw(100), ts(3));
        let flipped = election.update_winner(ONLINE).expect("challenger clears margin");
        assert_eq!(flipped.hash(), b.hash());
        assert_eq!(election.winner().hash(), b.hash());
    }

    #[test]
    fn voteless_challenger_flips_at_an_eighth() {
        // A fork whose stored block has no votes: the challenger only needs
        // an eighth of the online weight.
        let a = block(1);
        let b = block(2);
        let mut election = Election::new(a, ts(0));
        election.observe(b.clone());
        election.vote(voter(1), 1, b.clone(), Amount::raw(1000), ts(1));
        let flipped = election.update_winner(ONLINE).expect("1000 >= 0 + 1000");
        assert_eq!(flipped.hash(), b.hash());
    }

    #[test]
    fn state_blocks_elect_too() {
        let state = Block::State(
            StateBlockBuilder::new()
                .account(Account::from_bytes([1u8; 32]))
                .previous(BlockHash::from_bytes([2u8; 32]))
                .representative(Account::from_bytes([3u8; 32]))
                .balance(Amount::raw(1))
                .link(Link::ZERO)
                .sign(&kestrel_crypto::KeyPair::from_seed([1u8; 32])),
        );
        let mut election = Election::new(state.clone(), ts(0));
        election.vote(voter(1), 1, state.clone(), Amount::raw(1000), ts(1));
        assert!(election.try_confirm(ONLINE, ts(1)).is_some());
    }
}
