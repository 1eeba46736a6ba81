//! Network identifier.

use serde::{Deserialize, Serialize};

/// Identifies which Kestrel network a node participates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// The production network.
    Live,
    /// The public beta network.
    Beta,
    /// Local development network — trivial work thresholds.
    Dev,
}

impl Network {
    /// The byte carried in every wire message header.
    pub fn magic(&self) -> u8 {
        match self {
            Self::Live => b'L',
            Self::Beta => b'B',
            Self::Dev => b'D',
        }
    }

    /// Default peering port for this network.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Live => 7075,
            Self::Beta => 54000,
            Self::Dev => 44000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Beta => "beta",
            Self::Dev => "dev",
        }
    }
}
