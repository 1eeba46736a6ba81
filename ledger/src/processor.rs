//! Block validation and application.
//!
//! Each variant runs a fixed ladder of checks and either rejects with a
//! [`ProcessResult`] or applies its effects under the caller's write
//! transaction: block + sideband write, account record update, pending
//! creation/consumption, representation weight moves and frontier
//! maintenance. The frontier table is only written for legacy blocks;
//! dropping the entry when a state block lands on a legacy head is what
//! keeps legacy successors off state chains.

use heed::RwTxn;

use kestrel_blocks::{Block, BlockType, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock, StateBlock};
use kestrel_crypto::validate_message;
use kestrel_store::{BlockSideband, PendingInfo, PendingKey, StoreError};
use kestrel_types::{Account, Amount, BlockHash, Epoch};
use kestrel_utils::seconds_since_epoch;

use crate::ledger::Ledger;
use crate::result::{ProcessResult, ProcessReturn};

impl Ledger {
    /// Offer one block to the ledger.
    pub fn process(&self, txn: &mut RwTxn, block: &Block) -> Result<ProcessReturn, StoreError> {
        let result = match block {
            Block::Send(b) => self.process_send(txn, b),
            Block::Receive(b) => self.process_receive(txn, b),
            Block::Open(b) => self.process_open(txn, b),
            Block::Change(b) => self.process_change(txn, b),
            Block::State(b) => self.process_state(txn, b),
        }?;
        tracing::debug!(
            hash = %block.hash(),
            result = result.code.as_str(),
            "processed block"
        );
        Ok(result)
    }

    /// The account behind a rep-naming block (open, change or state).
    fn rep_account_of_block(
        &self,
        txn: &RwTxn,
        rep_block: &BlockHash,
    ) -> Result<Account, StoreError> {
        let (block, _) = self
            .store
            .blocks
            .get(txn, rep_block)?
            .ok_or(StoreError::NotFound)?;
        block.representative().ok_or_else(|| {
            StoreError::Corrupted(format!("{rep_block} does not name a representative"))
        })
    }

    fn process_send(&self, txn: &mut RwTxn, block: &SendBlock) -> Result<ProcessReturn, StoreError> {
        let hash = block.hash();
        if self
            .store
            .blocks
            .exists_typed(txn, BlockType::Send, &hash)?
        {
            return Ok(ProcessReturn::rejected(ProcessResult::Old));
        }
        let wrapped = Block::Send(block.clone());
        let Some(previous_type) = self.predecessor_acceptable(txn, &wrapped)? else {
            return Ok(ProcessReturn::rejected(ProcessResult::GapPrevious));
        };
        if !wrapped.valid_predecessor(previous_type) {
            return Ok(ProcessReturn::rejected(ProcessResult::BlockPosition));
        }
        // The previous block exists but is not a frontier: someone already
        // extended this chain position.
        let Some(account) = self.store.frontiers.get(txn, &block.previous)? else {
            return Ok(ProcessReturn::rejected(ProcessResult::Fork));
        };
        if !validate_message(&account, hash.as_bytes(), &block.signature) {
            return Ok(ProcessReturn::rejected(ProcessResult::BadSignature));
        }
        let info = self
            .store
            .accounts
            .get(txn, &account)?
            .ok_or_else(|| StoreError::Corrupted(format!("frontier without account {account}")))?;
        if block.balance > info.balance {
            return Ok(ProcessReturn::rejected(ProcessResult::NegativeSpend));
        }
        let amount = info.balance - block.balance;
        let representative = self.rep_account_of_block(txn, &info.rep_block)?;

        self.store
            .representation
            .subtract(txn, &representative, amount)?;
        self.block_put(
            txn,
            &hash,
            &wrapped,
            BlockSideband {
                successor: BlockHash::ZERO,
                account,
                height: info.block_count + 1,
                timestamp: seconds_since_epoch(),
                balance: block.balance,
                epoch: info.epoch,
            },
        )?;
        self.change_latest(
            txn,
            &account,
            hash,
            info.rep_block,
            block.balance,
            info.block_count + 1,
            info.epoch,
        )?;
        self.store.pending.put(
            txn,
            &PendingKey::new(block.destination, hash),
            &PendingInfo::new(account, amount, Epoch::Epoch0),
        )?;
        self.store.frontiers.del(txn, &block.previous)?;
        self.store.frontiers.put(txn, &hash, &account)?;
        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account,
            amount,
        })
    }

    fn process_receive(
        &self,
        txn: &mut RwTxn,
        block: &ReceiveBlock,
    ) -> Result<ProcessReturn, StoreError> {
        let hash = block.hash();
        if self
            .store
            .blocks
            .exists_typed(txn, BlockType::Receive, &hash)?
        {
            return Ok(ProcessReturn::rejected(ProcessResult::Old));
        }
        let wrapped = Block::Receive(block.clone());
        let Some(previous_type) = self.predecessor_acceptable(txn, &wrapped)? else {
            return Ok(ProcessReturn::rejected(ProcessResult::GapPrevious));
        };
        if !wrapped.valid_predecessor(previous_type) {
            return Ok(ProcessReturn::rejected(ProcessResult::BlockPosition));
        }
        let Some(account) = self.store.frontiers.get(txn, &block.previous)? else {
            return Ok(ProcessReturn::rejected(ProcessResult::Fork));
        };
        if !validate_message(&account, hash.as_bytes(), &block.signature) {
            return Ok(ProcessReturn::rejected(ProcessResult::BadSignature));
        }
        match self.store.blocks.get(txn, &block.source)? {
            None => return Ok(ProcessReturn::rejected(ProcessResult::GapSource)),
            Some((source_block, _))
                if !matches!(source_block.block_type(), BlockType::Send | BlockType::State) =>
            {
                return Ok(ProcessReturn::rejected(ProcessResult::NotReceiveFromSend));
            }
            Some(_) => {}
        }
        let info = self
            .store
            .accounts
            .get(txn, &account)?
            .ok_or_else(|| StoreError::Corrupted(format!("frontier without account {account}")))?;
        let key = PendingKey::new(account, block.source);
        let Some(pending) = self.store.pending.get(txn, &key)? else {
            return Ok(ProcessReturn::rejected(ProcessResult::Unreceivable));
        };
        // Receivables minted at a later epoch need a state receive.
        if pending.epoch != Epoch::Epoch0 {
            return Ok(ProcessReturn::rejected(ProcessResult::Unreceivable));
        }
        let Some(new_balance) = info.balance.checked_add(pending.amount) else {
            return Ok(ProcessReturn::rejected(ProcessResult::Overspend));
        };

        self.store.pending.del(txn, &key)?;
        self.block_put(
            txn,
            &hash,
            &wrapped,
            BlockSideband {
                successor: BlockHash::ZERO,
                account,
                height: info.block_count + 1,
                timestamp: seconds_since_epoch(),
                balance: new_balance,
                epoch: info.epoch,
            },
        )?;
        self.change_latest(
            txn,
            &account,
            hash,
            info.rep_block,
            new_balance,
            info.block_count + 1,
            info.epoch,
        )?;
        let representative = self.rep_account_of_block(txn, &info.rep_block)?;
        self.store
            .representation
            .add(txn, &representative, pending.amount)?;
        self.store.frontiers.del(txn, &block.previous)?;
        self.store.frontiers.put(txn, &hash, &account)?;
        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account,
            amount: pending.amount,
        })
    }

    fn process_open(&self, txn: &mut RwTxn, block: &OpenBlock) -> Result<ProcessReturn, StoreError> {
        let hash = block.hash();
        if self
            .store
            .blocks
            .exists_typed(txn, BlockType::Open, &hash)?
        {
            return Ok(ProcessReturn::rejected(ProcessResult::Old));
        }
        if !validate_message(&block.account, hash.as_bytes(), &block.signature) {
            return Ok(ProcessReturn::rejected(ProcessResult::BadSignature));
        }
        match self.store.blocks.get(txn, &block.source)? {
            None => return Ok(ProcessReturn::rejected(ProcessResult::GapSource)),
            Some((source_block, _))
                if !matches!(source_block.block_type(), BlockType::Send | BlockType::State) =>
            {
                return Ok(ProcessReturn::rejected(ProcessResult::NotReceiveFromSend));
            }
            Some(_) => {}
        }
        if self.store.accounts.get(txn, &block.account)?.is_some() {
            return Ok(ProcessReturn::rejected(ProcessResult::Fork));
        }
        let key = PendingKey::new(block.account, block.source);
        let Some(pending) = self.store.pending.get(txn, &key)? else {
            return Ok(ProcessReturn::rejected(ProcessResult::Unreceivable));
        };
        if block.account.is_zero() {
            return Ok(ProcessReturn::rejected(ProcessResult::OpenedBurnAccount));
        }
        if pending.epoch != Epoch::Epoch0 {
            return Ok(ProcessReturn::rejected(ProcessResult::Unreceivable));
        }

        self.store.pending.del(txn, &key)?;
        let wrapped = Block::Open(block.clone());
        self.block_put(
            txn,
            &hash,
            &wrapped,
            BlockSideband {
                successor: BlockHash::ZERO,
                account: block.account,
                height: 1,
                timestamp: seconds_since_epoch(),
                balance: pending.amount,
                epoch: Epoch::Epoch0,
            },
        )?;
        self.change_latest(
            txn,
            &block.account,
            hash,
            hash,
            pending.amount,
            1,
            Epoch::Epoch0,
        )?;
        self.store
            .representation
            .add(txn, &block.representative, pending.amount)?;
        self.store.frontiers.put(txn, &hash, &block.account)?;
        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account: block.account,
            amount: pending.amount,
        })
    }

    fn process_change(
        &self,
        txn: &mut RwTxn,
        block: &ChangeBlock,
    ) -> Result<ProcessReturn, StoreError> {
        let hash = block.hash();
        if self
            .store
            .blocks
            .exists_typed(txn, BlockType::Change, &hash)?
        {
            return Ok(ProcessReturn::rejected(ProcessResult::Old));
        }
        let wrapped = Block::Change(block.clone());
        let Some(previous_type) = self.predecessor_acceptable(txn, &wrapped)? else {
            return Ok(ProcessReturn::rejected(ProcessResult::GapPrevious));
        };
        if !wrapped.valid_predecessor(previous_type) {
            return Ok(ProcessReturn::rejected(ProcessResult::BlockPosition));
        }
        let Some(account) = self.store.frontiers.get(txn, &block.previous)? else {
            return Ok(ProcessReturn::rejected(ProcessResult::Fork));
        };
        if !validate_message(&account, hash.as_bytes(), &block.signature) {
            return Ok(ProcessReturn::rejected(ProcessResult::BadSignature));
        }
        let info = self
            .store
            .accounts
            .get(txn, &account)?
            .ok_or_else(|| StoreError::Corrupted(format!("frontier without account {account}")))?;

        self.block_put(
            txn,
            &hash,
            &wrapped,
            BlockSideband {
                successor: BlockHash::ZERO,
                account,
                height: info.block_count + 1,
                timestamp: seconds_since_epoch(),
                balance: info.balance,
                epoch: info.epoch,
            },
        )?;
        let previous_representative = self.rep_account_of_block(txn, &info.rep_block)?;
        self.store
            .representation
            .subtract(txn, &previous_representative, info.balance)?;
        self.store
            .representation
            .add(txn, &block.representative, info.balance)?;
        self.change_latest(
            txn,
            &account,
            hash,
            hash,
            info.balance,
            info.block_count + 1,
            info.epoch,
        )?;
        self.store.frontiers.del(txn, &block.previous)?;
        self.store.frontiers.put(txn, &hash, &account)?;
        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account,
            amount: Amount::ZERO,
        })
    }

    /// Route a state block: epoch marker in the link means an upgrade
    /// block, unless the balance moved — then it is an ordinary send whose
    /// destination happens to be the epoch account.
    fn process_state(
        &self,
        txn: &mut RwTxn,
        block: &StateBlock,
    ) -> Result<ProcessReturn, StoreError> {
        if self.is_epoch_link(&block.link) {
            if block.previous.is_zero() {
                return self.process_epoch(txn, block);
            }
            if !self.store.blocks.exists(txn, &block.previous)? {
                return Ok(ProcessReturn::rejected(ProcessResult::GapPrevious));
            }
            if self.balance(txn, &block.previous)? == block.balance {
                return self.process_epoch(txn, block);
            }
        }
        self.process_state_impl(txn, block)
    }

    fn process_state_impl(
        &self,
        txn: &mut RwTxn,
        block: &StateBlock,
    ) -> Result<ProcessReturn, StoreError> {
        let hash = block.hash();
        if self
            .store
            .blocks
            .exists_typed(txn, BlockType::State, &hash)?
        {
            return Ok(ProcessReturn::rejected(ProcessResult::Old));
        }
        if !validate_message(&block.account, hash.as_bytes(), &block.signature) {
            return Ok(ProcessReturn::rejected(ProcessResult::BadSignature));
        }
        if block.account.is_zero() {
            return Ok(ProcessReturn::rejected(ProcessResult::OpenedBurnAccount));
        }

        let existing = self.store.accounts.get(txn, &block.account)?;
        let mut epoch = Epoch::Epoch0;
        let mut is_send = false;
        let mut amount = block.balance;
        let (prev_balance, block_count) = match &existing {
            Some(info) => {
                epoch = info.epoch;
                // An open for an already-opened account contends for the
                // same slot as the real open: a fork, not a gap.
                if block.previous.is_zero() {
                    return Ok(ProcessReturn::rejected(ProcessResult::Fork));
                }
                if !self.store.blocks.exists(txn, &block.previous)? {
                    return Ok(ProcessReturn::rejected(ProcessResult::GapPrevious));
                }
                is_send = block.balance < info.balance;
                amount = if is_send {
                    info.balance - block.balance
                } else {
                    block.balance - info.balance
                };
                if block.previous != info.head {
                    return Ok(ProcessReturn::rejected(ProcessResult::Fork));
                }
                (info.balance, info.block_count)
            }
            None => {
                if !block.previous.is_zero() {
                    return Ok(ProcessReturn::rejected(ProcessResult::GapPrevious));
                }
                if block.link.is_zero() {
                    return Ok(ProcessReturn::rejected(ProcessResult::GapSource));
                }
                (Amount::ZERO, 0)
            }
        };

        if !is_send {
            if !block.link.is_zero() {
                // Receive subtype: the link names the source send.
                let source = block.link.as_block_hash();
                match self.store.blocks.get(txn, &source)? {
                    None => return Ok(ProcessReturn::rejected(ProcessResult::GapSource)),
                    Some((source_block, _))
                        if !matches!(
                            source_block.block_type(),
                            BlockType::Send | BlockType::State
                        ) =>
                    {
                        return Ok(ProcessReturn::rejected(ProcessResult::NotReceiveFromSend));
                    }
                    Some(_) => {}
                }
                let key = PendingKey::new(block.account, source);
                let Some(pending) = self.store.pending.get(txn, &key)? else {
                    return Ok(ProcessReturn::rejected(ProcessResult::Unreceivable));
                };
                if amount != pending.amount {
                    return Ok(ProcessReturn::rejected(ProcessResult::BalanceMismatch));
                }
                epoch = epoch.max(pending.epoch);
            } else if !amount.is_zero() {
                // No link and no debit: only the representative may change.
                return Ok(ProcessReturn::rejected(ProcessResult::BalanceMismatch));
            }
        }

        self.block_put(
            txn,
            &hash,
            &Block::State(block.clone()),
            BlockSideband {
                successor: BlockHash::ZERO,
                account: block.account,
                height: block_count + 1,
                timestamp: seconds_since_epoch(),
                balance: block.balance,
                epoch,
            },
        )?;

        if let Some(info) = &existing {
            if !info.rep_block.is_zero() {
                let previous_representative = self.rep_account_of_block(txn, &info.rep_block)?;
                self.store
                    .representation
                    .subtract(txn, &previous_representative, prev_balance)?;
            }
        }
        self.store
            .representation
            .add(txn, &block.representative, block.balance)?;

        if is_send {
            self.store.pending.put(
                txn,
                &PendingKey::new(block.link.as_account(), hash),
                &PendingInfo::new(block.account, amount, epoch),
            )?;
        } else if !block.link.is_zero() {
            self.store
                .pending
                .del(txn, &PendingKey::new(block.account, block.link.as_block_hash()))?;
        }

        self.change_latest(
            txn,
            &block.account,
            hash,
            hash,
            block.balance,
            block_count + 1,
            epoch,
        )?;
        // State heads have no frontier entry; remove the legacy one this
        // block replaced, which also bars legacy successors.
        if let Some(info) = &existing {
            if self.store.frontiers.get(txn, &info.head)?.is_some() {
                self.store.frontiers.del(txn, &info.head)?;
            }
        }
        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account: block.account,
            amount,
        })
    }

    fn process_epoch(
        &self,
        txn: &mut RwTxn,
        block: &StateBlock,
    ) -> Result<ProcessReturn, StoreError> {
        let hash = block.hash();
        if self
            .store
            .blocks
            .exists_typed(txn, BlockType::State, &hash)?
        {
            return Ok(ProcessReturn::rejected(ProcessResult::Old));
        }
        // Epoch blocks are signed by the epoch authority, not the account.
        if !validate_message(
            &self.constants.epoch_signer,
            hash.as_bytes(),
            &block.signature,
        ) {
            return Ok(ProcessReturn::rejected(ProcessResult::BadSignature));
        }
        if block.account.is_zero() {
            return Ok(ProcessReturn::rejected(ProcessResult::OpenedBurnAccount));
        }

        let existing = self.store.accounts.get(txn, &block.account)?;
        match &existing {
            Some(info) => {
                if block.previous.is_zero() {
                    return Ok(ProcessReturn::rejected(ProcessResult::Fork));
                }
                if block.previous != info.head {
                    return Ok(ProcessReturn::rejected(ProcessResult::Fork));
                }
                // The upgrade may not smuggle in a representative change.
                if block.representative != self.rep_account_of_block(txn, &info.rep_block)? {
                    return Ok(ProcessReturn::rejected(ProcessResult::RepresentativeMismatch));
                }
            }
            None => {
                if !block.previous.is_zero() {
                    return Ok(ProcessReturn::rejected(ProcessResult::GapPrevious));
                }
                if !block.representative.is_zero() {
                    return Ok(ProcessReturn::rejected(ProcessResult::RepresentativeMismatch));
                }
            }
        }
        let (balance, block_count, current_epoch) = match &existing {
            Some(info) => (info.balance, info.block_count, info.epoch),
            None => (Amount::ZERO, 0, Epoch::Epoch0),
        };
        if current_epoch != Epoch::Epoch0 {
            return Ok(ProcessReturn::rejected(ProcessResult::BlockPosition));
        }
        if block.balance != balance {
            return Ok(ProcessReturn::rejected(ProcessResult::BalanceMismatch));
        }

        self.block_put(
            txn,
            &hash,
            &Block::State(block.clone()),
            BlockSideband {
                successor: BlockHash::ZERO,
                account: block.account,
                height: block_count + 1,
                timestamp: seconds_since_epoch(),
                balance,
                epoch: Epoch::Epoch1,
            },
        )?;
        self.change_latest(
            txn,
            &block.account,
            hash,
            hash,
            balance,
            block_count + 1,
            Epoch::Epoch1,
        )?;
        if let Some(info) = &existing {
            if self.store.frontiers.get(txn, &info.head)?.is_some() {
                self.store.frontiers.del(txn, &info.head)?;
            }
        }
        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account: block.account,
            amount: Amount::ZERO,
        })
    }
}
