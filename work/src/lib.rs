//! Proof-of-work generation and validation.
//!
//! Every block carries a 64-bit work nonce covering its root (`previous` if
//! nonzero, else the account). The work digest is the 64-bit Blake2b of
//! `root ‖ work_le`, read little-endian, and a block is acceptable when the
//! digest is **below** the applicable threshold — smaller thresholds are
//! harder.

pub mod generator;
pub mod thresholds;
pub mod validator;

pub use generator::WorkGenerator;
pub use thresholds::{WorkKind, WorkThresholds};
pub use validator::{validate_work, work_value};
