//! Store error taxonomy.
//!
//! Every store call either succeeds or reports one of these four kinds.
//! `NotFound` is an expected outcome and most lookups surface it as an
//! `Ok(None)` instead; `Corrupted` is fatal to the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,

    #[error("database is corrupted: {0}")]
    Corrupted(String),

    #[error("storage allocation failed (map or transaction full)")]
    Allocation,

    #[error("bad transaction: {0}")]
    BadTransaction(String),
}
