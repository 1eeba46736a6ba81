//! Block decoding errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("block payload has the wrong length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown block type tag: {0}")]
    UnknownType(u8),

    #[error("type tag {0:?} does not name a deserializable block")]
    NotABlock(crate::BlockType),
}
