//! Per-network ledger constants.

use std::collections::HashMap;

use kestrel_types::{Account, Amount, Link, Network};
use kestrel_work::WorkThresholds;

use crate::bootstrap_weights::bootstrap_weights;
use crate::genesis::{dev_genesis_key, Genesis};

/// Everything about a network the ledger needs at validation time.
#[derive(Clone, Debug)]
pub struct LedgerConstants {
    pub network: Network,
    pub genesis: Genesis,
    /// Link value marking an epoch-1 upgrade block.
    pub epoch_link: Link,
    /// Account allowed to sign epoch blocks on others' chains.
    pub epoch_signer: Account,
    pub work: WorkThresholds,
    /// Hardcoded voting-weight override used while the local ledger is
    /// still far behind the network.
    pub bootstrap_weights: HashMap<Account, Amount>,
    /// Block-count checkpoint past which the override is dropped for good.
    pub bootstrap_weight_max_blocks: u64,
}

impl LedgerConstants {
    pub fn for_network(network: Network) -> Self {
        let genesis = Genesis::for_network(network);
        let epoch_signer = match network {
            // On dev networks the genesis key doubles as the epoch signer.
            Network::Dev => dev_genesis_key().account(),
            _ => genesis.account,
        };
        let (bootstrap_weight_max_blocks, weights) = bootstrap_weights(network);
        Self {
            network,
            genesis,
            epoch_link: epoch_link_v1(),
            epoch_signer,
            work: WorkThresholds::for_network(network),
            bootstrap_weights: weights,
            bootstrap_weight_max_blocks,
        }
    }

    pub fn dev() -> Self {
        Self::for_network(Network::Dev)
    }
}

/// The epoch-1 marker carried in the link field of upgrade blocks.
pub fn epoch_link_v1() -> Link {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(b"kestrel epoch v1");
    Link::from_bytes(bytes)
}
