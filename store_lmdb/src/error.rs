//! Mapping from `heed` errors onto the store error taxonomy.

use kestrel_store::StoreError;

/// Collapse a backend error into one of the four store error kinds.
///
/// Corruption is preserved as such — callers treat it as fatal. Space
/// exhaustion maps to `Allocation`; everything else aborts the current
/// transaction as `BadTransaction`.
pub fn map_heed(error: heed::Error) -> StoreError {
    match error {
        heed::Error::Mdb(heed::MdbError::Corrupted) => {
            StoreError::Corrupted("lmdb reports corruption".to_string())
        }
        heed::Error::Mdb(heed::MdbError::PageNotFound) => {
            StoreError::Corrupted("lmdb page not found".to_string())
        }
        heed::Error::Mdb(heed::MdbError::MapFull)
        | heed::Error::Mdb(heed::MdbError::TxnFull)
        | heed::Error::Mdb(heed::MdbError::ReadersFull) => StoreError::Allocation,
        other => StoreError::BadTransaction(other.to_string()),
    }
}
