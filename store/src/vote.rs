//! Signed representative votes.

use kestrel_blocks::Block;
use kestrel_crypto::{blake2b_256_multi, sign_message, validate_message, KeyPair};
use kestrel_types::{Account, Signature};

use crate::error::StoreError;

/// A representative's statement that `block` should win the election at its
/// root. Sequences are monotone per voter; a replayed or stale vote never
/// displaces a newer one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub voter: Account,
    pub sequence: u64,
    pub block: Block,
    pub signature: Signature,
}

impl Vote {
    /// The digest covered by the vote signature: `hash(block) ‖ sequence_le`.
    pub fn digest(&self) -> [u8; 32] {
        blake2b_256_multi(&[self.block.hash().as_bytes(), &self.sequence.to_le_bytes()])
    }

    /// Construct and sign a vote.
    pub fn new(keys: &KeyPair, sequence: u64, block: Block) -> Self {
        let mut vote = Self {
            voter: keys.account(),
            sequence,
            block,
            signature: Signature::ZERO,
        };
        vote.signature = sign_message(keys, &vote.digest());
        vote
    }

    /// Verify the signature against the voter account.
    pub fn validate(&self) -> bool {
        validate_message(&self.voter, &self.digest(), &self.signature)
    }

    /// `voter(32) ‖ sequence(8 LE) ‖ signature(64) ‖ type_tag ‖ block`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(104 + 1 + self.block.to_bytes().len());
        bytes.extend_from_slice(self.voter.as_bytes());
        bytes.extend_from_slice(&self.sequence.to_le_bytes());
        bytes.extend_from_slice(self.signature.as_bytes());
        bytes.extend_from_slice(&self.block.serialize_with_type());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < 105 {
            return Err(StoreError::Corrupted("vote record too short".to_string()));
        }
        let voter = Account::from_bytes(bytes[0..32].try_into().unwrap());
        let sequence = u64::from_le_bytes(bytes[32..40].try_into().unwrap());
        let signature = Signature::from_bytes(bytes[40..104].try_into().unwrap());
        let block = Block::deserialize_with_type(&bytes[104..])
            .map_err(|e| StoreError::Corrupted(format!("vote block: {e}")))?;
        Ok(Self {
            voter,
            sequence,
            block,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_blocks::builder::change_block;
    use kestrel_types::BlockHash;

    fn sample_block(keys: &KeyPair) -> Block {
        change_block(BlockHash::from_bytes([1u8; 32]), keys.account(), keys, 0)
    }

    #[test]
    fn signed_vote_validates() {
        let keys = KeyPair::from_seed([11u8; 32]);
        let vote = Vote::new(&keys, 3, sample_block(&keys));
        assert!(vote.validate());
    }

    #[test]
    fn sequence_is_covered_by_signature() {
        let keys = KeyPair::from_seed([11u8; 32]);
        let mut vote = Vote::new(&keys, 3, sample_block(&keys));
        vote.sequence = 4;
        assert!(!vote.validate());
    }

    #[test]
    fn roundtrip() {
        let keys = KeyPair::from_seed([12u8; 32]);
        let vote = Vote::new(&keys, 9, sample_block(&keys));
        let decoded = Vote::from_bytes(&vote.to_bytes()).unwrap();
        assert_eq!(decoded, vote);
        assert!(decoded.validate());
    }
}
