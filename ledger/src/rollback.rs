//! Undoing blocks.
//!
//! Rolling back to a hash removes blocks from the owning account's head
//! backwards until that hash is gone, undoing every side effect: pending
//! entries are re-created or deleted, representation weights move back and
//! frontiers retreat. Rolling back a send whose receivable was already
//! claimed first cascades into the destination account. The caller's write
//! transaction makes the whole cascade atomic.

use heed::RwTxn;

use kestrel_blocks::{Block, BlockType, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock, StateBlock};
use kestrel_store::{AccountInfo, PendingInfo, PendingKey, StoreError};
use kestrel_types::{Account, BlockHash, Epoch};

use crate::ledger::Ledger;

impl Ledger {
    /// Remove blocks from the owning chain until `target` is no longer
    /// stored. Returns the undone hashes, newest first.
    pub fn rollback(
        &self,
        txn: &mut RwTxn,
        target: &BlockHash,
    ) -> Result<Vec<BlockHash>, StoreError> {
        let mut list = Vec::new();
        self.rollback_to(txn, target, &mut list)?;
        Ok(list)
    }

    fn rollback_to(
        &self,
        txn: &mut RwTxn,
        target: &BlockHash,
        list: &mut Vec<BlockHash>,
    ) -> Result<(), StoreError> {
        if !self.store.blocks.exists(txn, target)? {
            return Err(StoreError::NotFound);
        }
        let account = self
            .account(txn, target)?
            .ok_or_else(|| StoreError::Corrupted(format!("block {target} has no account")))?;
        while self.store.blocks.exists(txn, target)? {
            let info = self
                .store
                .accounts
                .get(txn, &account)?
                .ok_or_else(|| StoreError::Corrupted(format!("missing account {account}")))?;
            let (block, _) = self
                .store
                .blocks
                .get(txn, &info.head)?
                .ok_or_else(|| StoreError::Corrupted(format!("missing head {}", info.head)))?;
            list.push(info.head);
            tracing::debug!(hash = %info.head, account = %account, "rolling back");
            match &block {
                Block::Send(b) => self.rollback_send(txn, b, &account, &info, list)?,
                Block::Receive(b) => self.rollback_receive(txn, b, &account, &info)?,
                Block::Open(b) => self.rollback_open(txn, b, &account)?,
                Block::Change(b) => self.rollback_change(txn, b, &account, &info)?,
                Block::State(b) => self.rollback_state(txn, b, &info, list)?,
            }
        }
        Ok(())
    }

    fn rollback_send(
        &self,
        txn: &mut RwTxn,
        block: &SendBlock,
        account: &Account,
        info: &AccountInfo,
        list: &mut Vec<BlockHash>,
    ) -> Result<(), StoreError> {
        let hash = info.head;
        let key = PendingKey::new(block.destination, hash);
        // If the destination already claimed the receivable, undo its
        // receive first; that re-creates the pending entry.
        while !self.store.pending.exists(txn, &key)? {
            let destination_head = self
                .latest(txn, &block.destination)?
                .ok_or_else(|| StoreError::Corrupted("claimed send with no destination chain".to_string()))?;
            self.rollback_to(txn, &destination_head, list)?;
        }
        let pending = self
            .store
            .pending
            .get(txn, &key)?
            .ok_or(StoreError::NotFound)?;
        self.store.pending.del(txn, &key)?;

        let representative = self.representative(txn, &hash)?;
        self.store
            .representation
            .add(txn, &representative, pending.amount)?;
        let previous_balance = self.balance(txn, &block.previous)?;
        self.change_latest(
            txn,
            account,
            block.previous,
            info.rep_block,
            previous_balance,
            info.block_count - 1,
            info.epoch,
        )?;
        self.store.blocks.del(txn, &hash)?;
        self.store.frontiers.del(txn, &hash)?;
        self.store.frontiers.put(txn, &block.previous, account)?;
        self.store.blocks.successor_clear(txn, &block.previous)?;
        Ok(())
    }

    fn rollback_receive(
        &self,
        txn: &mut RwTxn,
        block: &ReceiveBlock,
        account: &Account,
        info: &AccountInfo,
    ) -> Result<(), StoreError> {
        let hash = info.head;
        let amount = self.amount(txn, &block.source)?;
        let source_account = self.account(txn, &block.source)?.unwrap_or(Account::ZERO);
        let representative = self.representative(txn, &hash)?;
        self.store
            .representation
            .subtract(txn, &representative, amount)?;

        let rep_block = self.representative_block(txn, &block.previous)?;
        let previous_balance = self.balance(txn, &block.previous)?;
        self.change_latest(
            txn,
            account,
            block.previous,
            rep_block,
            previous_balance,
            info.block_count - 1,
            info.epoch,
        )?;
        self.store.blocks.del(txn, &hash)?;
        self.store.pending.put(
            txn,
            &PendingKey::new(*account, block.source),
            &PendingInfo::new(source_account, amount, Epoch::Epoch0),
        )?;
        self.store.frontiers.del(txn, &hash)?;
        self.store.frontiers.put(txn, &block.previous, account)?;
        self.store.blocks.successor_clear(txn, &block.previous)?;
        Ok(())
    }

    fn rollback_open(
        &self,
        txn: &mut RwTxn,
        block: &OpenBlock,
        account: &Account,
    ) -> Result<(), StoreError> {
        let hash = block.hash();
        let amount = self.amount(txn, &hash)?;
        let source_account = self.account(txn, &block.source)?.unwrap_or(Account::ZERO);
        self.store
            .representation
            .subtract(txn, &block.representative, amount)?;
        // Removing the only block unopens the account.
        self.change_latest(
            txn,
            account,
            BlockHash::ZERO,
            BlockHash::ZERO,
            kestrel_types::Amount::ZERO,
            0,
            Epoch::Epoch0,
        )?;
        self.store.blocks.del(txn, &hash)?;
        self.store.pending.put(
            txn,
            &PendingKey::new(*account, block.source),
            &PendingInfo::new(source_account, amount, Epoch::Epoch0),
        )?;
        self.store.frontiers.del(txn, &hash)?;
        Ok(())
    }

    fn rollback_change(
        &self,
        txn: &mut RwTxn,
        block: &ChangeBlock,
        account: &Account,
        info: &AccountInfo,
    ) -> Result<(), StoreError> {
        let hash = info.head;
        let rep_block = self.representative_block(txn, &block.previous)?;
        let previous_representative = {
            let (rep_naming, _) = self
                .store
                .blocks
                .get(txn, &rep_block)?
                .ok_or(StoreError::NotFound)?;
            rep_naming
                .representative()
                .ok_or_else(|| StoreError::Corrupted("rep block names no representative".to_string()))?
        };
        self.store
            .representation
            .subtract(txn, &block.representative, info.balance)?;
        self.store
            .representation
            .add(txn, &previous_representative, info.balance)?;
        self.change_latest(
            txn,
            account,
            block.previous,
            rep_block,
            info.balance,
            info.block_count - 1,
            info.epoch,
        )?;
        self.store.blocks.del(txn, &hash)?;
        self.store.frontiers.del(txn, &hash)?;
        self.store.frontiers.put(txn, &block.previous, account)?;
        self.store.blocks.successor_clear(txn, &block.previous)?;
        Ok(())
    }

    fn rollback_state(
        &self,
        txn: &mut RwTxn,
        block: &StateBlock,
        info: &AccountInfo,
        list: &mut Vec<BlockHash>,
    ) -> Result<(), StoreError> {
        let hash = info.head;
        let previous_balance = self.balance(txn, &block.previous)?;
        let is_send = block.balance < previous_balance;

        self.store
            .representation
            .subtract(txn, &block.representative, block.balance)?;
        let rep_block = if block.previous.is_zero() {
            BlockHash::ZERO
        } else {
            self.representative_block(txn, &block.previous)?
        };
        if !rep_block.is_zero() {
            let representative = self.representative(txn, &block.previous)?;
            self.store
                .representation
                .add(txn, &representative, previous_balance)?;
        }

        if is_send {
            let key = PendingKey::new(block.link.as_account(), hash);
            while !self.store.pending.exists(txn, &key)? {
                let destination_head = self
                    .latest(txn, &block.link.as_account())?
                    .ok_or_else(|| {
                        StoreError::Corrupted("claimed send with no destination chain".to_string())
                    })?;
                self.rollback_to(txn, &destination_head, list)?;
            }
            self.store.pending.del(txn, &key)?;
        } else if !block.link.is_zero() && !self.is_epoch_link(&block.link) {
            // Receive subtype: restore the receivable with the source
            // block's epoch.
            let source = block.link.as_block_hash();
            let (source_account, source_epoch) = match self.store.blocks.get(txn, &source)? {
                Some((_, sideband)) => (sideband.account, sideband.epoch),
                None => (Account::ZERO, Epoch::Epoch0),
            };
            self.store.pending.put(
                txn,
                &PendingKey::new(block.account, source),
                &PendingInfo::new(source_account, block.balance - previous_balance, source_epoch),
            )?;
        }

        if block.previous.is_zero() {
            self.change_latest(
                txn,
                &block.account,
                BlockHash::ZERO,
                BlockHash::ZERO,
                kestrel_types::Amount::ZERO,
                0,
                Epoch::Epoch0,
            )?;
        } else {
            let (previous_block, previous_sideband) = self
                .store
                .blocks
                .get(txn, &block.previous)?
                .ok_or(StoreError::NotFound)?;
            self.change_latest(
                txn,
                &block.account,
                block.previous,
                rep_block,
                previous_balance,
                info.block_count - 1,
                previous_sideband.epoch,
            )?;
            self.store.blocks.successor_clear(txn, &block.previous)?;
            // A legacy predecessor becomes a frontier again.
            if previous_block.block_type() != BlockType::State {
                self.store
                    .frontiers
                    .put(txn, &block.previous, &block.account)?;
            }
        }
        self.store.blocks.del(txn, &hash)?;
        Ok(())
    }
}
