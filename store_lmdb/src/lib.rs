//! LMDB storage backend for the Kestrel ledger.
//!
//! One `heed` environment holds every logical table. All reads and writes go
//! through explicit transactions obtained from [`LmdbStore`]: read
//! transactions are snapshot-isolated and may run concurrently; the single
//! write transaction serializes all mutations and its reads observe its own
//! uncommitted writes.

pub mod account;
pub mod block;
pub mod block_info;
pub mod checksum;
pub mod environment;
pub mod error;
pub mod frontier;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod pending;
pub mod rep_weights;
pub mod unchecked;
pub mod vote;

pub use account::AccountStore;
pub use block::BlockStore;
pub use block_info::BlockInfoStore;
pub use checksum::ChecksumStore;
pub use environment::LmdbStore;
pub use error::map_heed;
pub use frontier::FrontierStore;
pub use integrity::{check_integrity, IntegrityReport};
pub use meta::MetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use pending::PendingStore;
pub use rep_weights::RepresentationStore;
pub use unchecked::UncheckedStore;
pub use vote::VoteStore;

/// Increment a byte string in place to form an exclusive upper bound for
/// prefix range scans. Returns false when the prefix is all 0xFF and no
/// upper bound exists.
pub(crate) fn increment_prefix(prefix: &mut [u8]) -> bool {
    for byte in prefix.iter_mut().rev() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            return true;
        }
    }
    false
}
