//! The Kestrel ledger: the validation state machine over the block store.
//!
//! A ledger consumes blocks under a write transaction and either applies
//! them, returning [`ProcessResult::Progress`], or rejects them with one of
//! the other process results. Validation outcomes are values, never errors;
//! `Err` from a ledger call always means a storage fault.

pub mod bootstrap_weights;
pub mod constants;
pub mod genesis;
pub mod ledger;
pub mod processor;
pub mod result;
pub mod rollback;

pub use constants::LedgerConstants;
pub use genesis::{dev_genesis_key, Genesis};
pub use ledger::Ledger;
pub use result::{ProcessResult, ProcessReturn};
