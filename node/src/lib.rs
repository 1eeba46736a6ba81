//! Node-level plumbing around the ledger core: the block processor and its
//! unchecked bookkeeping, the bootstrap client and server, vote processing,
//! the wallet-facing block factory and TOML configuration.

pub mod block_processor;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod node;
pub mod sync;
pub mod vote_processor;
pub mod wallet;

pub use block_processor::{BlockProcessor, ProcessorStats};
pub use bootstrap::{compare_frontiers, serve_bulk, serve_frontiers, BulkRefused, PullRequest};
pub use config::NodeConfig;
pub use error::NodeError;
pub use node::KestrelNode;
pub use sync::{BootstrapClient, BootstrapServer, MAX_OUTSTANDING_PULLS};
pub use vote_processor::VoteProcessor;
pub use wallet::{receive_work_threshold, BlockFactory};
