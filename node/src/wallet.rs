//! The wallet-facing block factory.
//!
//! The ledger never looks inside a wallet; it only consumes blocks. This
//! factory is the contract's other half: given a key pair and an intended
//! transition (send, receive, change representative), it reads the account
//! state, assembles a signed state block and solves proof-of-work for the
//! correct epoch threshold.

use std::sync::Arc;

use kestrel_blocks::{Block, StateBlockBuilder};
use kestrel_crypto::KeyPair;
use kestrel_ledger::Ledger;
use kestrel_store::PendingKey;
use kestrel_types::{Account, Amount, BlockHash, Epoch, Link};
use kestrel_work::{WorkGenerator, WorkKind, WorkThresholds};

use crate::error::NodeError;

/// Threshold for a receive-side block claiming a receivable minted at
/// `epoch`. Epoch 1 accounts use the uniform epoch-1 threshold; epoch 2
/// unlocks the cheaper receive-side one.
pub fn receive_work_threshold(work: &WorkThresholds, epoch: Epoch) -> u64 {
    work.threshold(epoch, WorkKind::Receive)
}

pub struct BlockFactory {
    keys: KeyPair,
    ledger: Arc<Ledger>,
    generator: WorkGenerator,
}

impl BlockFactory {
    pub fn new(keys: KeyPair, ledger: Arc<Ledger>) -> Self {
        Self {
            keys,
            ledger,
            generator: WorkGenerator,
        }
    }

    pub fn account(&self) -> Account {
        self.keys.account()
    }

    /// Build a signed, worked send of `amount` to `destination`.
    pub fn send(&self, destination: Account, amount: Amount) -> Result<Block, NodeError> {
        let txn = self.ledger.store.tx_begin_read()?;
        let info = self
            .ledger
            .store
            .accounts
            .get(&txn, &self.keys.account())?
            .ok_or_else(|| NodeError::Wallet("account is not opened".to_string()))?;
        let balance = info
            .balance
            .checked_sub(amount)
            .ok_or_else(|| NodeError::Wallet("amount exceeds the balance".to_string()))?;
        let representative = self.current_representative(&txn, &info.rep_block)?;
        let work = self.solve(info.head.into(), info.epoch, WorkKind::Send)?;
        Ok(Block::State(
            StateBlockBuilder::new()
                .account(self.keys.account())
                .previous(info.head)
                .representative(representative)
                .balance(balance)
                .link(Link::from(destination))
                .work(work)
                .sign(&self.keys),
        ))
    }

    /// Build a signed, worked receive (or open) claiming the receivable
    /// left by `source`.
    pub fn receive(&self, source: BlockHash) -> Result<Block, NodeError> {
        let txn = self.ledger.store.tx_begin_read()?;
        let account = self.keys.account();
        let pending = self
            .ledger
            .store
            .pending
            .get(&txn, &PendingKey::new(account, source))?
            .ok_or_else(|| NodeError::Wallet("nothing pending from that source".to_string()))?;
        let info = self.ledger.store.accounts.get(&txn, &account)?;
        let (previous, balance, representative, epoch) = match &info {
            Some(info) => (
                info.head,
                info.balance
                    .checked_add(pending.amount)
                    .ok_or_else(|| NodeError::Wallet("receive overflows the balance".to_string()))?,
                self.current_representative(&txn, &info.rep_block)?,
                info.epoch.max(pending.epoch),
            ),
            // Opening: the account is its own first representative.
            None => (BlockHash::ZERO, pending.amount, account, pending.epoch),
        };
        let root = match &info {
            Some(info) => info.head.into(),
            None => account.into(),
        };
        let work = self.solve(root, epoch, WorkKind::Receive)?;
        Ok(Block::State(
            StateBlockBuilder::new()
                .account(account)
                .previous(previous)
                .representative(representative)
                .balance(balance)
                .link(Link::from(source))
                .work(work)
                .sign(&self.keys),
        ))
    }

    /// Build a signed, worked representative change.
    pub fn change(&self, representative: Account) -> Result<Block, NodeError> {
        let txn = self.ledger.store.tx_begin_read()?;
        let info = self
            .ledger
            .store
            .accounts
            .get(&txn, &self.keys.account())?
            .ok_or_else(|| NodeError::Wallet("account is not opened".to_string()))?;
        let work = self.solve(info.head.into(), info.epoch, WorkKind::Send)?;
        Ok(Block::State(
            StateBlockBuilder::new()
                .account(self.keys.account())
                .previous(info.head)
                .representative(representative)
                .balance(info.balance)
                .link(Link::ZERO)
                .work(work)
                .sign(&self.keys),
        ))
    }

    fn current_representative(
        &self,
        txn: &heed::RoTxn,
        rep_block: &BlockHash,
    ) -> Result<Account, NodeError> {
        let (block, _) = self
            .ledger
            .store
            .blocks
            .get(txn, rep_block)?
            .ok_or_else(|| NodeError::Wallet("representative block is missing".to_string()))?;
        block
            .representative()
            .ok_or_else(|| NodeError::Wallet("representative block names none".to_string()))
    }

    fn solve(
        &self,
        root: kestrel_types::Root,
        epoch: Epoch,
        kind: WorkKind,
    ) -> Result<u64, NodeError> {
        let threshold = self.ledger.constants.work.threshold(epoch, kind);
        self.generator
            .generate(&root, threshold)
            .ok_or_else(|| NodeError::Wallet("work generation exhausted".to_string()))
    }
}
