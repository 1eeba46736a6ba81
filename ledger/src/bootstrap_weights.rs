//! Hardcoded representative weights for nodes that are still syncing.
//!
//! A freshly bootstrapping node has seen too few blocks to know real
//! voting weights, which would let an attacker's votes dominate. Until the
//! local block count passes the checkpoint below, `Ledger::weight` answers
//! from this table for the accounts it lists; after that the override is
//! permanently dropped.

use std::collections::HashMap;

use kestrel_types::{Account, Amount, Network};

/// Principal live representatives as sampled at the checkpoint release.
const LIVE_WEIGHTS: &[(&str, u128)] = &[
    (
        "B4A1874B4E1AFF768B57ED4D9B2CB0CCE597AEF55C55BB4E7735B1E61FA79E21",
        34_578_000_000_000_000_000_000_000_000_000_000,
    ),
    (
        "273C1D9AF87A04FDC1F8E6D90A1CE0C1DC76CB2BB22F19EC5B0C5063A6CFE9E3",
        21_067_000_000_000_000_000_000_000_000_000_000,
    ),
    (
        "5C2FBB148E006A8E8BA7A75DD86C9FE00C83F5FFDBFD76EAA09531071436B6AF",
        12_906_000_000_000_000_000_000_000_000_000_000,
    ),
    (
        "2512C2D6B5D7E4D2D8D8C86CFC43BA9C75CBB4FB2FBFAB0C60C2F0DF409BB3A4",
        8_541_000_000_000_000_000_000_000_000_000_000,
    ),
];

const LIVE_WEIGHT_MAX_BLOCKS: u64 = 10_300_000;

/// `(checkpoint, weights)` for a network. Dev and beta ledgers are always
/// considered caught up.
pub fn bootstrap_weights(network: Network) -> (u64, HashMap<Account, Amount>) {
    match network {
        Network::Live => {
            let weights = LIVE_WEIGHTS
                .iter()
                .map(|(account, weight)| {
                    (
                        Account::decode_hex(account).expect("bootstrap weight constant"),
                        Amount::raw(*weight),
                    )
                })
                .collect();
            (LIVE_WEIGHT_MAX_BLOCKS, weights)
        }
        Network::Beta | Network::Dev => (0, HashMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_table_parses() {
        let (checkpoint, weights) = bootstrap_weights(Network::Live);
        assert!(checkpoint > 0);
        assert_eq!(weights.len(), LIVE_WEIGHTS.len());
    }

    #[test]
    fn dev_has_no_override() {
        let (checkpoint, weights) = bootstrap_weights(Network::Dev);
        assert_eq!(checkpoint, 0);
        assert!(weights.is_empty());
    }
}
