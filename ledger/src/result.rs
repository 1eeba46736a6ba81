//! Ledger process results.

use kestrel_types::{Account, Amount};

/// Outcome of offering one block to the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Applied; a new head was established.
    Progress,
    /// Already present in the store.
    Old,
    /// Signature does not verify against the signing account.
    BadSignature,
    /// The previous block is not in the store.
    GapPrevious,
    /// The source block is not in the store.
    GapSource,
    /// A different block already occupies this chain position.
    Fork,
    /// A send claims a balance above its predecessor's.
    NegativeSpend,
    /// Crediting the receive would push the balance past the supply.
    Overspend,
    /// The named source is not pending for this destination.
    Unreceivable,
    /// The named source is not a send.
    NotReceiveFromSend,
    /// The block opens or targets the burn account.
    OpenedBurnAccount,
    /// A legacy block may not extend a state head (or vice versa).
    BlockPosition,
    /// The claimed balance does not match the computed one.
    BalanceMismatch,
    /// An epoch block tried to change the representative.
    RepresentativeMismatch,
}

impl ProcessResult {
    /// Short stable name, used in logs and the RPC surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessResult::Progress => "progress",
            ProcessResult::Old => "old",
            ProcessResult::BadSignature => "bad_signature",
            ProcessResult::GapPrevious => "gap_previous",
            ProcessResult::GapSource => "gap_source",
            ProcessResult::Fork => "fork",
            ProcessResult::NegativeSpend => "negative_spend",
            ProcessResult::Overspend => "overspend",
            ProcessResult::Unreceivable => "unreceivable",
            ProcessResult::NotReceiveFromSend => "not_receive_from_send",
            ProcessResult::OpenedBurnAccount => "opened_burn_account",
            ProcessResult::BlockPosition => "block_position",
            ProcessResult::BalanceMismatch => "balance_mismatch",
            ProcessResult::RepresentativeMismatch => "representative_mismatch",
        }
    }
}

/// What the ledger did with a block.
#[derive(Clone, Copy, Debug)]
pub struct ProcessReturn {
    pub code: ProcessResult,
    /// The account the block acts on (zero when rejection happens before
    /// the account is known).
    pub account: Account,
    /// The amount moved by the block (zero for change and epoch blocks).
    pub amount: Amount,
}

impl ProcessReturn {
    pub fn rejected(code: ProcessResult) -> Self {
        Self {
            code,
            account: Account::ZERO,
            amount: Amount::ZERO,
        }
    }
}
