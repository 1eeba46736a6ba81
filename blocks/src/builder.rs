//! Signed block construction.
//!
//! Builders compute the hash over the assembled hashables, sign it with the
//! supplied key pair, and leave the work nonce to the caller — work is a
//! property of the root, not the contents, and is often produced by a
//! separate worker.

use kestrel_crypto::{sign_message, KeyPair};
use kestrel_types::{Account, Amount, BlockHash, Link, Signature};

use crate::{Block, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock, StateBlock};

/// Fluent builder for state blocks.
#[derive(Clone, Debug)]
pub struct StateBlockBuilder {
    account: Account,
    previous: BlockHash,
    representative: Account,
    balance: Amount,
    link: Link,
    work: u64,
}

impl Default for StateBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBlockBuilder {
    pub fn new() -> Self {
        Self {
            account: Account::ZERO,
            previous: BlockHash::ZERO,
            representative: Account::ZERO,
            balance: Amount::ZERO,
            link: Link::ZERO,
            work: 0,
        }
    }

    pub fn account(mut self, account: Account) -> Self {
        self.account = account;
        self
    }

    pub fn previous(mut self, previous: BlockHash) -> Self {
        self.previous = previous;
        self
    }

    pub fn representative(mut self, representative: Account) -> Self {
        self.representative = representative;
        self
    }

    pub fn balance(mut self, balance: Amount) -> Self {
        self.balance = balance;
        self
    }

    pub fn link(mut self, link: Link) -> Self {
        self.link = link;
        self
    }

    pub fn work(mut self, work: u64) -> Self {
        self.work = work;
        self
    }

    /// Assemble, hash and sign the block.
    pub fn sign(self, keys: &KeyPair) -> StateBlock {
        let mut block = StateBlock {
            account: self.account,
            previous: self.previous,
            representative: self.representative,
            balance: self.balance,
            link: self.link,
            signature: Signature::ZERO,
            work: self.work,
        };
        block.signature = sign_message(keys, block.hash().as_bytes());
        block
    }
}

/// Build a signed legacy send block.
pub fn send_block(
    previous: BlockHash,
    destination: Account,
    balance: Amount,
    keys: &KeyPair,
    work: u64,
) -> Block {
    let mut block = SendBlock {
        previous,
        destination,
        balance,
        signature: Signature::ZERO,
        work,
    };
    block.signature = sign_message(keys, block.hash().as_bytes());
    Block::Send(block)
}

/// Build a signed legacy receive block.
pub fn receive_block(previous: BlockHash, source: BlockHash, keys: &KeyPair, work: u64) -> Block {
    let mut block = ReceiveBlock {
        previous,
        source,
        signature: Signature::ZERO,
        work,
    };
    block.signature = sign_message(keys, block.hash().as_bytes());
    Block::Receive(block)
}

/// Build a signed legacy open block for the key pair's account.
pub fn open_block(source: BlockHash, representative: Account, keys: &KeyPair, work: u64) -> Block {
    let mut block = OpenBlock {
        source,
        representative,
        account: keys.account(),
        signature: Signature::ZERO,
        work,
    };
    block.signature = sign_message(keys, block.hash().as_bytes());
    Block::Open(block)
}

/// Build a signed legacy change block.
pub fn change_block(
    previous: BlockHash,
    representative: Account,
    keys: &KeyPair,
    work: u64,
) -> Block {
    let mut block = ChangeBlock {
        previous,
        representative,
        signature: Signature::ZERO,
        work,
    };
    block.signature = sign_message(keys, block.hash().as_bytes());
    Block::Change(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_crypto::validate_message;

    #[test]
    fn state_builder_signs_over_hash() {
        let keys = KeyPair::from_seed([1u8; 32]);
        let block = StateBlockBuilder::new()
            .account(keys.account())
            .representative(keys.account())
            .balance(Amount::raw(42))
            .link(Link::from_bytes([9u8; 32]))
            .sign(&keys);
        assert!(validate_message(
            &keys.account(),
            block.hash().as_bytes(),
            &block.signature
        ));
    }

    #[test]
    fn legacy_builders_sign_over_hash() {
        let keys = KeyPair::from_seed([2u8; 32]);
        let source = BlockHash::from_bytes([3u8; 32]);
        let open = open_block(source, keys.account(), &keys, 0);
        assert!(validate_message(
            &keys.account(),
            open.hash().as_bytes(),
            open.signature()
        ));

        let send = send_block(
            open.hash(),
            Account::from_bytes([4u8; 32]),
            Amount::raw(7),
            &keys,
            0,
        );
        assert!(validate_message(
            &keys.account(),
            send.hash().as_bytes(),
            send.signature()
        ));
    }

    #[test]
    fn tampering_invalidates_signature() {
        let keys = KeyPair::from_seed([5u8; 32]);
        let block = StateBlockBuilder::new()
            .account(keys.account())
            .balance(Amount::raw(1))
            .sign(&keys);
        let mut tampered = block.clone();
        tampered.balance = Amount::raw(2);
        assert!(!validate_message(
            &keys.account(),
            tampered.hash().as_bytes(),
            &tampered.signature
        ));
    }
}
