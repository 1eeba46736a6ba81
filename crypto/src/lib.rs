//! Cryptographic primitives for the Kestrel ledger.
//!
//! Blake2b digests over block hashables and Ed25519 signatures over block
//! hashes. Accounts double as verifying keys, so signature checks need no
//! key registry.

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi, blake2b_64};
pub use keys::KeyPair;
pub use sign::{sign_message, validate_message};
