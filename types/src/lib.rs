//! Fundamental types for the Kestrel ledger.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: accounts, block hashes, amounts, signatures, epochs, timestamps
//! and network identifiers.

pub mod account;
pub mod amount;
pub mod epoch;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod time;

pub use account::Account;
pub use amount::Amount;
pub use epoch::Epoch;
pub use error::ParseError;
pub use hash::{BlockHash, Link, Root};
pub use keys::{RawKey, Signature};
pub use network::Network;
pub use time::Timestamp;
