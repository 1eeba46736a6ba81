//! Sparse block checkpoint record.
//!
//! Older schema versions wrote `(account, balance)` checkpoints for legacy
//! blocks that lack an in-band balance. Current code writes sidebands with
//! balances instead; these records survive only until migration 7→8
//! backfills them away.

use kestrel_types::{Account, Amount};

use crate::error::StoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub account: Account,
    pub balance: Amount,
}

impl BlockInfo {
    pub const SERIALIZED_SIZE: usize = 32 + 16;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SERIALIZED_SIZE);
        bytes.extend_from_slice(self.account.as_bytes());
        bytes.extend_from_slice(&self.balance.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(StoreError::Corrupted(
                "block info record has the wrong length".to_string(),
            ));
        }
        Ok(Self {
            account: Account::from_bytes(bytes[0..32].try_into().unwrap()),
            balance: Amount::from_be_bytes(bytes[32..48].try_into().unwrap()),
        })
    }
}
