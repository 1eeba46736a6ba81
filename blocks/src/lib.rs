//! Block model for the Kestrel ledger.
//!
//! Five block variants form each account's hash chain: the legacy `send`,
//! `receive`, `open` and `change` blocks, and the universal `state` block
//! that subsumes them. Algorithms that branch per variant match on the
//! [`Block`] sum.
//!
//! Hashes cover only the hashable fields; signature and work ride alongside.
//! Proof-of-work covers the block's root (`previous`, or the account for a
//! first block) and is checked at ingress, not here.

pub mod builder;
pub mod change;
pub mod error;
pub mod open;
pub mod receive;
pub mod send;
pub mod state;

pub use builder::StateBlockBuilder;
pub use change::ChangeBlock;
pub use error::BlockError;
pub use open::OpenBlock;
pub use receive::ReceiveBlock;
pub use send::SendBlock;
pub use state::StateBlock;

use kestrel_types::{Account, Amount, BlockHash, Link, Root, Signature};

/// Wire type tag for blocks. The values are serialized into message
/// extensions and bulk-pull streams and must never be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockType {
    Invalid,
    /// Stream terminator for bulk pulls; not a real block.
    NotABlock,
    Send,
    Receive,
    Open,
    Change,
    State,
}

impl BlockType {
    pub fn as_u8(self) -> u8 {
        match self {
            BlockType::Invalid => 0,
            BlockType::NotABlock => 1,
            BlockType::Send => 2,
            BlockType::Receive => 3,
            BlockType::Open => 4,
            BlockType::Change => 5,
            BlockType::State => 6,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BlockType::Invalid),
            1 => Some(BlockType::NotABlock),
            2 => Some(BlockType::Send),
            3 => Some(BlockType::Receive),
            4 => Some(BlockType::Open),
            5 => Some(BlockType::Change),
            6 => Some(BlockType::State),
            _ => None,
        }
    }

    /// Serialized payload size for this type, if it names a real block.
    pub fn serialized_size(self) -> Option<usize> {
        match self {
            BlockType::Send => Some(SendBlock::SERIALIZED_SIZE),
            BlockType::Receive => Some(ReceiveBlock::SERIALIZED_SIZE),
            BlockType::Open => Some(OpenBlock::SERIALIZED_SIZE),
            BlockType::Change => Some(ChangeBlock::SERIALIZED_SIZE),
            BlockType::State => Some(StateBlock::SERIALIZED_SIZE),
            BlockType::Invalid | BlockType::NotABlock => None,
        }
    }
}

/// A block of any variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
    State(StateBlock),
}

impl Block {
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Send(_) => BlockType::Send,
            Block::Receive(_) => BlockType::Receive,
            Block::Open(_) => BlockType::Open,
            Block::Change(_) => BlockType::Change,
            Block::State(_) => BlockType::State,
        }
    }

    pub fn hash(&self) -> BlockHash {
        match self {
            Block::Send(b) => b.hash(),
            Block::Receive(b) => b.hash(),
            Block::Open(b) => b.hash(),
            Block::Change(b) => b.hash(),
            Block::State(b) => b.hash(),
        }
    }

    /// The election slot this block contends for: `previous` when nonzero,
    /// else the account being opened.
    pub fn root(&self) -> Root {
        match self {
            Block::Send(b) => b.root(),
            Block::Receive(b) => b.root(),
            Block::Open(b) => b.root(),
            Block::Change(b) => b.root(),
            Block::State(b) => b.root(),
        }
    }

    /// The predecessor hash; zero for blocks that open an account.
    pub fn previous(&self) -> BlockHash {
        match self {
            Block::Send(b) => b.previous,
            Block::Receive(b) => b.previous,
            Block::Open(_) => BlockHash::ZERO,
            Block::Change(b) => b.previous,
            Block::State(b) => b.previous,
        }
    }

    /// The source send hash for variants that carry one in-band.
    ///
    /// State blocks return zero: their link is only a source for the receive
    /// subtype, which the ledger determines from the balance delta.
    pub fn source(&self) -> BlockHash {
        match self {
            Block::Receive(b) => b.source,
            Block::Open(b) => b.source,
            Block::Send(_) | Block::Change(_) | Block::State(_) => BlockHash::ZERO,
        }
    }

    /// The destination account for variants that carry one in-band.
    ///
    /// State blocks return zero for the same reason as [`Block::source`].
    pub fn destination(&self) -> Account {
        match self {
            Block::Send(b) => b.destination,
            _ => Account::ZERO,
        }
    }

    /// The representative named by this block, if the variant carries one.
    pub fn representative(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.representative),
            Block::Change(b) => Some(b.representative),
            Block::State(b) => Some(b.representative),
            Block::Send(_) | Block::Receive(_) => None,
        }
    }

    /// The balance-after field, for variants that carry one.
    pub fn balance_field(&self) -> Option<Amount> {
        match self {
            Block::Send(b) => Some(b.balance),
            Block::State(b) => Some(b.balance),
            _ => None,
        }
    }

    /// The in-band account, for variants that carry one.
    pub fn account_field(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.account),
            Block::State(b) => Some(b.account),
            _ => None,
        }
    }

    /// The state-block link field.
    pub fn link_field(&self) -> Option<Link> {
        match self {
            Block::State(b) => Some(b.link),
            _ => None,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Block::Send(b) => &b.signature,
            Block::Receive(b) => &b.signature,
            Block::Open(b) => &b.signature,
            Block::Change(b) => &b.signature,
            Block::State(b) => &b.signature,
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Block::Send(b) => b.work,
            Block::Receive(b) => b.work,
            Block::Open(b) => b.work,
            Block::Change(b) => b.work,
            Block::State(b) => b.work,
        }
    }

    /// Whether a block of this variant may follow a predecessor of
    /// `previous_type` in a chain.
    ///
    /// Legacy blocks may not extend a state block — once an account has a
    /// state head its history never regresses to the legacy schema. State
    /// blocks accept any predecessor. Open blocks have no predecessor at
    /// all.
    pub fn valid_predecessor(&self, previous_type: BlockType) -> bool {
        let legacy = matches!(
            previous_type,
            BlockType::Send | BlockType::Receive | BlockType::Open | BlockType::Change
        );
        match self {
            Block::Send(_) | Block::Receive(_) | Block::Change(_) => legacy,
            Block::State(_) => legacy || previous_type == BlockType::State,
            Block::Open(_) => false,
        }
    }

    /// Serialize the payload without a type tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Block::Send(b) => b.to_bytes(),
            Block::Receive(b) => b.to_bytes(),
            Block::Open(b) => b.to_bytes(),
            Block::Change(b) => b.to_bytes(),
            Block::State(b) => b.to_bytes(),
        }
    }

    /// Serialize as `type_tag ‖ payload`, the form used on bulk-pull
    /// streams and in the unchecked table.
    pub fn serialize_with_type(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + StateBlock::SERIALIZED_SIZE);
        bytes.push(self.block_type().as_u8());
        bytes.extend_from_slice(&self.to_bytes());
        bytes
    }

    /// Deserialize a payload of a known type.
    pub fn deserialize(block_type: BlockType, bytes: &[u8]) -> Result<Self, BlockError> {
        match block_type {
            BlockType::Send => SendBlock::from_bytes(bytes).map(Block::Send),
            BlockType::Receive => ReceiveBlock::from_bytes(bytes).map(Block::Receive),
            BlockType::Open => OpenBlock::from_bytes(bytes).map(Block::Open),
            BlockType::Change => ChangeBlock::from_bytes(bytes).map(Block::Change),
            BlockType::State => StateBlock::from_bytes(bytes).map(Block::State),
            BlockType::Invalid | BlockType::NotABlock => Err(BlockError::NotABlock(block_type)),
        }
    }

    /// Deserialize `type_tag ‖ payload`.
    pub fn deserialize_with_type(bytes: &[u8]) -> Result<Self, BlockError> {
        let (&tag, payload) = bytes
            .split_first()
            .ok_or(BlockError::UnknownType(u8::MAX))?;
        let block_type = BlockType::from_u8(tag).ok_or(BlockError::UnknownType(tag))?;
        Self::deserialize(block_type, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_sample() -> Block {
        Block::State(StateBlock {
            account: Account::from_bytes([1u8; 32]),
            previous: BlockHash::from_bytes([2u8; 32]),
            representative: Account::from_bytes([3u8; 32]),
            balance: Amount::raw(10),
            link: Link::ZERO,
            signature: Signature::ZERO,
            work: 0,
        })
    }

    #[test]
    fn type_tags_are_stable() {
        assert_eq!(BlockType::Invalid.as_u8(), 0);
        assert_eq!(BlockType::NotABlock.as_u8(), 1);
        assert_eq!(BlockType::Send.as_u8(), 2);
        assert_eq!(BlockType::Receive.as_u8(), 3);
        assert_eq!(BlockType::Open.as_u8(), 4);
        assert_eq!(BlockType::Change.as_u8(), 5);
        assert_eq!(BlockType::State.as_u8(), 6);
        for tag in 0..7u8 {
            assert_eq!(BlockType::from_u8(tag).unwrap().as_u8(), tag);
        }
        assert!(BlockType::from_u8(7).is_none());
    }

    #[test]
    fn typed_serialization_roundtrip() {
        let block = state_sample();
        let bytes = block.serialize_with_type();
        assert_eq!(bytes[0], BlockType::State.as_u8());
        let decoded = Block::deserialize_with_type(&bytes).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
    }

    #[test]
    fn not_a_block_does_not_deserialize() {
        assert_eq!(
            Block::deserialize(BlockType::NotABlock, &[]),
            Err(BlockError::NotABlock(BlockType::NotABlock))
        );
    }

    #[test]
    fn legacy_cannot_follow_state() {
        let send = Block::Send(SendBlock {
            previous: BlockHash::from_bytes([1u8; 32]),
            destination: Account::from_bytes([2u8; 32]),
            balance: Amount::ZERO,
            signature: Signature::ZERO,
            work: 0,
        });
        assert!(send.valid_predecessor(BlockType::Send));
        assert!(send.valid_predecessor(BlockType::Open));
        assert!(!send.valid_predecessor(BlockType::State));
        assert!(!send.valid_predecessor(BlockType::NotABlock));
    }

    #[test]
    fn state_accepts_any_real_predecessor() {
        let block = state_sample();
        for previous in [
            BlockType::Send,
            BlockType::Receive,
            BlockType::Open,
            BlockType::Change,
            BlockType::State,
        ] {
            assert!(block.valid_predecessor(previous));
        }
        assert!(!block.valid_predecessor(BlockType::Invalid));
    }

    #[test]
    fn source_and_destination_are_variant_specific() {
        let block = state_sample();
        assert!(block.source().is_zero());
        assert!(block.destination().is_zero());
        let open = Block::Open(OpenBlock {
            source: BlockHash::from_bytes([5u8; 32]),
            representative: Account::from_bytes([6u8; 32]),
            account: Account::from_bytes([7u8; 32]),
            signature: Signature::ZERO,
            work: 0,
        });
        assert_eq!(open.source(), BlockHash::from_bytes([5u8; 32]));
        assert_eq!(open.previous(), BlockHash::ZERO);
    }
}
