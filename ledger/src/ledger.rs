//! The ledger proper: shared queries, account bookkeeping and the
//! whole-ledger checksum. Block validation lives in `processor`, undo in
//! `rollback`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use heed::{RoTxn, RwTxn};

use kestrel_blocks::{Block, BlockType, StateBlock};
use kestrel_store::{AccountInfo, StoreError};
use kestrel_store_lmdb::LmdbStore;
use kestrel_types::{Account, Amount, BlockHash, Epoch, Link, Root};
use kestrel_utils::seconds_since_epoch;

use crate::constants::LedgerConstants;

pub struct Ledger {
    pub store: Arc<LmdbStore>,
    pub constants: LedgerConstants,
    check_bootstrap_weights: AtomicBool,
}

impl Ledger {
    pub fn new(store: Arc<LmdbStore>, constants: LedgerConstants) -> Self {
        Self {
            store,
            constants,
            check_bootstrap_weights: AtomicBool::new(true),
        }
    }

    /// Seed the genesis block into an empty store. Idempotent.
    pub fn initialize(&self, txn: &mut RwTxn) -> Result<(), StoreError> {
        if self.store.accounts.count(txn)? > 0 {
            return Ok(());
        }
        let genesis = &self.constants.genesis;
        let hash = genesis.hash();
        let sideband = kestrel_store::BlockSideband {
            successor: BlockHash::ZERO,
            account: genesis.account,
            height: 1,
            timestamp: seconds_since_epoch(),
            balance: crate::genesis::Genesis::AMOUNT,
            epoch: Epoch::Epoch0,
        };
        self.store
            .blocks
            .put(txn, &hash, &genesis.block, &sideband)?;
        self.change_latest(
            txn,
            &genesis.account,
            hash,
            hash,
            crate::genesis::Genesis::AMOUNT,
            1,
            Epoch::Epoch0,
        )?;
        self.store
            .representation
            .add(txn, &genesis.account, crate::genesis::Genesis::AMOUNT)?;
        self.store.frontiers.put(txn, &hash, &genesis.account)?;
        tracing::info!(genesis = %hash, network = self.constants.network.as_str(), "ledger initialized");
        Ok(())
    }

    /// The fixed monetary base.
    pub fn supply(&self) -> Amount {
        crate::genesis::Genesis::AMOUNT
    }

    /// Balance after the block `hash`; zero for the zero hash.
    pub fn balance(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Amount, StoreError> {
        if hash.is_zero() {
            return Ok(Amount::ZERO);
        }
        match self.store.blocks.get(txn, hash)? {
            Some((_, sideband)) => Ok(sideband.balance),
            None => Err(StoreError::NotFound),
        }
    }

    /// Balance of an account, zero when unopened.
    pub fn account_balance(&self, txn: &RoTxn, account: &Account) -> Result<Amount, StoreError> {
        Ok(self
            .store
            .accounts
            .get(txn, account)?
            .map(|info| info.balance)
            .unwrap_or(Amount::ZERO))
    }

    /// Sum of unclaimed receivables addressed to `account`.
    pub fn account_pending(&self, txn: &RoTxn, account: &Account) -> Result<Amount, StoreError> {
        let mut total = Amount::ZERO;
        for entry in self.store.pending.iter_account(txn, account)? {
            let (_, info) = entry?;
            total = total
                .checked_add(info.amount)
                .ok_or_else(|| StoreError::Corrupted("pending total exceeds supply".to_string()))?;
        }
        Ok(total)
    }

    /// The amount moved by the block `hash` — the absolute balance delta
    /// against its predecessor. Reads at most the block and its sideband.
    pub fn amount(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Amount, StoreError> {
        let (block, sideband) = self
            .store
            .blocks
            .get(txn, hash)?
            .ok_or(StoreError::NotFound)?;
        let previous_balance = self.balance(txn, &block.previous())?;
        Ok(if sideband.balance >= previous_balance {
            sideband.balance - previous_balance
        } else {
            previous_balance - sideband.balance
        })
    }

    /// The account a stored block belongs to.
    pub fn account(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Option<Account>, StoreError> {
        Ok(self
            .store
            .blocks
            .get(txn, hash)?
            .map(|(_, sideband)| sideband.account))
    }

    /// Head hash of an account's chain, if opened.
    pub fn latest(&self, txn: &RoTxn, account: &Account) -> Result<Option<BlockHash>, StoreError> {
        Ok(self
            .store
            .accounts
            .get(txn, account)?
            .map(|info| info.head))
    }

    /// The root new blocks for this account must carry: the head when
    /// opened, else the account itself.
    pub fn latest_root(&self, txn: &RoTxn, account: &Account) -> Result<Root, StoreError> {
        Ok(match self.latest(txn, account)? {
            Some(head) => Root::from(head),
            None => Root::from(*account),
        })
    }

    /// Voting weight of an account. While the local ledger is below the
    /// bootstrap checkpoint, the hardcoded override table answers instead;
    /// past the checkpoint the override is dropped permanently.
    pub fn weight(&self, txn: &RoTxn, account: &Account) -> Result<Amount, StoreError> {
        if self.check_bootstrap_weights.load(Ordering::Relaxed) {
            let blocks = self.store.blocks.count(txn)?;
            if blocks < self.constants.bootstrap_weight_max_blocks {
                if let Some(weight) = self.constants.bootstrap_weights.get(account) {
                    return Ok(*weight);
                }
            } else {
                self.check_bootstrap_weights.store(false, Ordering::Relaxed);
            }
        }
        self.store.representation.get(txn, account)
    }

    /// Hash of the newest block at or before `hash` that names a
    /// representative.
    pub fn representative_block(
        &self,
        txn: &RoTxn,
        hash: &BlockHash,
    ) -> Result<BlockHash, StoreError> {
        let mut cursor = *hash;
        while !cursor.is_zero() {
            let (block, _) = self
                .store
                .blocks
                .get(txn, &cursor)?
                .ok_or(StoreError::NotFound)?;
            if block.representative().is_some() {
                return Ok(cursor);
            }
            cursor = block.previous();
        }
        Ok(BlockHash::ZERO)
    }

    /// The representative account in force at block `hash`.
    pub fn representative(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Account, StoreError> {
        let rep_block = self.representative_block(txn, hash)?;
        if rep_block.is_zero() {
            return Ok(Account::ZERO);
        }
        let (block, _) = self
            .store
            .blocks
            .get(txn, &rep_block)?
            .ok_or(StoreError::NotFound)?;
        Ok(block
            .representative()
            .expect("representative_block returned a block naming one"))
    }

    pub fn block_exists(&self, txn: &RoTxn, hash: &BlockHash) -> Result<bool, StoreError> {
        self.store.blocks.exists(txn, hash)
    }

    pub fn is_epoch_link(&self, link: &Link) -> bool {
        *link == self.constants.epoch_link
    }

    /// Whether a state block debits its account. Requires the predecessor
    /// to be present.
    pub fn is_send(&self, txn: &RoTxn, block: &StateBlock) -> Result<bool, StoreError> {
        if block.previous.is_zero() {
            return Ok(false);
        }
        Ok(block.balance < self.balance(txn, &block.previous)?)
    }

    /// Source hash for receive-like blocks; routes the state link by
    /// subtype. Zero for everything else.
    pub fn block_source(&self, txn: &RoTxn, block: &Block) -> Result<BlockHash, StoreError> {
        if let Block::State(state) = block {
            if !self.is_send(txn, state)? && !self.is_epoch_link(&state.link) {
                return Ok(state.link.as_block_hash());
            }
            return Ok(BlockHash::ZERO);
        }
        Ok(block.source())
    }

    /// Destination account for send-like blocks. Zero for everything else.
    pub fn block_destination(&self, txn: &RoTxn, block: &Block) -> Result<Account, StoreError> {
        if let Block::State(state) = block {
            if self.is_send(txn, state)? {
                return Ok(state.link.as_account());
            }
            return Ok(Account::ZERO);
        }
        Ok(block.destination())
    }

    /// Whether every dependency of `block` is already stored — the cheap
    /// pre-check used before queueing work for the writer.
    pub fn could_fit(&self, txn: &RoTxn, block: &Block) -> Result<bool, StoreError> {
        match block {
            Block::Send(b) => self.store.blocks.exists(txn, &b.previous),
            Block::Change(b) => self.store.blocks.exists(txn, &b.previous),
            Block::Receive(b) => Ok(self.store.blocks.exists(txn, &b.previous)?
                && self.store.blocks.exists(txn, &b.source)?),
            Block::Open(b) => self.store.blocks.exists(txn, &b.source),
            Block::State(b) => {
                if !b.previous.is_zero() && !self.store.blocks.exists(txn, &b.previous)? {
                    return Ok(false);
                }
                if !b.previous.is_zero() && self.is_send(txn, b)? {
                    return Ok(true);
                }
                Ok(b.link.is_zero()
                    || self.is_epoch_link(&b.link)
                    || self.store.blocks.exists(txn, &b.link.as_block_hash())?)
            }
        }
    }

    /// The whole-ledger fingerprint: XOR of every account frontier.
    pub fn checksum(&self, txn: &RoTxn) -> Result<BlockHash, StoreError> {
        Ok(self
            .store
            .checksum
            .get(txn, 0, 0)?
            .unwrap_or(BlockHash::ZERO))
    }

    /// Toggle a frontier hash in the checksum region. XOR is its own
    /// inverse, so adding and removing a head are the same operation.
    pub(crate) fn checksum_toggle(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
    ) -> Result<(), StoreError> {
        if hash.is_zero() {
            return Ok(());
        }
        let mut digest = *self
            .store
            .checksum
            .get(txn, 0, 0)?
            .unwrap_or(BlockHash::ZERO)
            .as_bytes();
        for (slot, byte) in hash.as_bytes().iter().enumerate() {
            digest[slot] ^= byte;
        }
        self.store
            .checksum
            .put(txn, 0, 0, &BlockHash::from_bytes(digest))
    }

    /// Update (or delete, when `hash` is zero) the account record after a
    /// head change, maintaining the checksum region as the frontier moves.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn change_latest(
        &self,
        txn: &mut RwTxn,
        account: &Account,
        hash: BlockHash,
        rep_block: BlockHash,
        balance: Amount,
        block_count: u64,
        epoch: Epoch,
    ) -> Result<(), StoreError> {
        let existing = self.store.accounts.get(txn, account)?;
        if let Some(info) = &existing {
            self.checksum_toggle(txn, &info.head)?;
        }
        if hash.is_zero() {
            if existing.is_some() {
                self.store.accounts.del(txn, account)?;
            }
            return Ok(());
        }
        self.checksum_toggle(txn, &hash)?;
        let open_block = match &existing {
            Some(info) => info.open_block,
            None => hash,
        };
        let info = AccountInfo {
            head: hash,
            open_block,
            rep_block,
            balance,
            modified: seconds_since_epoch(),
            block_count,
            epoch,
        };
        self.store.accounts.put(txn, account, &info)
    }

    /// Store a block plus its reconstructed sideband and maintain the
    /// predecessor's successor link.
    pub(crate) fn block_put(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
        block: &Block,
        sideband: kestrel_store::BlockSideband,
    ) -> Result<(), StoreError> {
        self.store.blocks.put(txn, hash, block, &sideband)?;
        let previous = block.previous();
        if !previous.is_zero() {
            self.store.blocks.successor_set(txn, &previous, hash)?;
        }
        Ok(())
    }

    /// Whether the stored predecessor permits this block's variant
    /// (legacy blocks may not extend a state head).
    pub(crate) fn predecessor_acceptable(
        &self,
        txn: &RoTxn,
        block: &Block,
    ) -> Result<Option<BlockType>, StoreError> {
        let previous = block.previous();
        match self.store.blocks.get(txn, &previous)? {
            None => Ok(None),
            Some((previous_block, _)) => Ok(Some(previous_block.block_type())),
        }
    }
}
