//! Node errors.

use thiserror::Error;

use kestrel_ledger::ProcessResult;
use kestrel_store::StoreError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("storage fault: {0}")]
    Store(#[from] StoreError),

    #[error("configuration: {0}")]
    Config(String),

    #[error("wallet cannot build the block: {0}")]
    Wallet(String),

    #[error("ledger rejected the block: {}", .0.as_str())]
    Rejected(ProcessResult),

    #[error("bootstrap peer misbehaved: {0}")]
    Bootstrap(String),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}
