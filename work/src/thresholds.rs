//! Per-epoch, per-subtype work thresholds.
//!
//! Thresholds compare against the work digest with `<`, so a smaller
//! threshold admits fewer nonces and is therefore harder. Epoch 2 splits the
//! threshold by subtype: receive-side blocks (receive, open) are cheaper
//! than send-side blocks, matching the cost asymmetry of the operations.

use kestrel_types::{Epoch, Network};

/// Which side of a transfer a block sits on, for threshold selection.
///
/// Receive covers the receive and open subtypes; everything else (send,
/// change, epoch) is send-side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkKind {
    Send,
    Receive,
}

/// The threshold table for one network.
#[derive(Clone, Copy, Debug)]
pub struct WorkThresholds {
    pub epoch_1: u64,
    pub epoch_2_send: u64,
    pub epoch_2_receive: u64,
}

impl WorkThresholds {
    /// Production thresholds.
    pub fn live() -> Self {
        Self {
            epoch_1: 0x0000_0040_0000_0000,
            epoch_2_send: 0x0000_0008_0000_0000,
            epoch_2_receive: 0x0000_0200_0000_0000,
        }
    }

    /// Beta network — one eighth of the production difficulty.
    pub fn beta() -> Self {
        Self {
            epoch_1: 0x0000_0200_0000_0000,
            epoch_2_send: 0x0000_0040_0000_0000,
            epoch_2_receive: 0x0000_1000_0000_0000,
        }
    }

    /// Dev network — trivial thresholds so tests solve work instantly.
    pub fn dev() -> Self {
        Self {
            epoch_1: 0x1000_0000_0000_0000,
            epoch_2_send: 0x1000_0000_0000_0000,
            epoch_2_receive: 0x1000_0000_0000_0000,
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Live => Self::live(),
            Network::Beta => Self::beta(),
            Network::Dev => Self::dev(),
        }
    }

    /// The threshold an account at `epoch` must meet for a block of `kind`.
    ///
    /// Epochs 0 and 1 use a single threshold for every subtype.
    pub fn threshold(&self, epoch: Epoch, kind: WorkKind) -> u64 {
        match epoch {
            Epoch::Epoch0 | Epoch::Epoch1 => self.epoch_1,
            Epoch::Epoch2 => match kind {
                WorkKind::Send => self.epoch_2_send,
                WorkKind::Receive => self.epoch_2_receive,
            },
        }
    }

    /// The most permissive threshold in the table, applied at ingress
    /// before the account's epoch is known.
    pub fn admission(&self) -> u64 {
        self.epoch_1.max(self.epoch_2_receive)
    }
}
