//! CPU work generation.

use rand::Rng;

use kestrel_types::Root;

use crate::validator::work_value;

/// Brute-force nonce search for a root.
///
/// Scans nonces from a random starting point so concurrent generators do not
/// duplicate effort.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkGenerator;

impl WorkGenerator {
    /// Find a nonce whose digest is below `threshold`.
    ///
    /// Returns `None` if the attempt budget is exhausted; with realistic
    /// thresholds this only happens when `threshold` is absurdly small.
    pub fn generate(&self, root: &Root, threshold: u64) -> Option<u64> {
        const MAX_ATTEMPTS: u64 = 1 << 32;
        let mut nonce: u64 = rand::thread_rng().gen();
        for _ in 0..MAX_ATTEMPTS {
            if work_value(root, nonce) < threshold {
                return Some(nonce);
            }
            nonce = nonce.wrapping_add(1);
        }
        None
    }
}
