//! Record types shared by ledger storage backends.
//!
//! Every value persisted by the block store is a fixed-layout byte record
//! defined here, together with the store error taxonomy. The LMDB backend
//! lives in `kestrel-store-lmdb`; the rest of the workspace depends only on
//! these records and on that backend's transaction handles.

pub mod account;
pub mod block_info;
pub mod error;
pub mod pending;
pub mod sideband;
pub mod unchecked;
pub mod vote;

pub use account::AccountInfo;
pub use block_info::BlockInfo;
pub use error::StoreError;
pub use pending::{PendingInfo, PendingKey};
pub use sideband::BlockSideband;
pub use unchecked::UncheckedInfo;
pub use vote::Vote;
