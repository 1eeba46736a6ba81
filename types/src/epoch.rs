//! Account schema epochs.
//!
//! An epoch is a schema version for accounts. Epoch transitions are recorded
//! by dedicated epoch blocks and unlock new block subtypes and proof-of-work
//! thresholds. Epochs only ever move forward.

use serde::{Deserialize, Serialize};

/// Account epoch tag, stored in account records, pending entries and block
/// sidebands.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Epoch {
    #[default]
    Epoch0,
    Epoch1,
    Epoch2,
}

impl Epoch {
    pub fn as_u8(self) -> u8 {
        match self {
            Epoch::Epoch0 => 0,
            Epoch::Epoch1 => 1,
            Epoch::Epoch2 => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Epoch::Epoch0),
            1 => Some(Epoch::Epoch1),
            2 => Some(Epoch::Epoch2),
            _ => None,
        }
    }

    /// The next epoch, if any.
    pub fn successor(self) -> Option<Self> {
        match self {
            Epoch::Epoch0 => Some(Epoch::Epoch1),
            Epoch::Epoch1 => Some(Epoch::Epoch2),
            Epoch::Epoch2 => None,
        }
    }
}
