//! Parse errors for textual representations of core types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hex encoding")]
    InvalidHex,

    #[error("value has the wrong length")]
    InvalidLength,
}
