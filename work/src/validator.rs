//! Work digest computation and validation.

use kestrel_crypto::blake2b_64;
use kestrel_types::Root;

/// The 64-bit work digest of `root ‖ work_le`.
pub fn work_value(root: &Root, work: u64) -> u64 {
    blake2b_64(&[root.as_bytes(), &work.to_le_bytes()])
}

/// Whether `work` satisfies `threshold` for `root`.
pub fn validate_work(root: &Root, work: u64, threshold: u64) -> bool {
    work_value(root, work) < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_value_is_deterministic() {
        let root = Root::from_bytes([1u8; 32]);
        assert_eq!(work_value(&root, 42), work_value(&root, 42));
        assert_ne!(work_value(&root, 42), work_value(&root, 43));
    }

    #[test]
    fn zero_threshold_never_validates() {
        let root = Root::from_bytes([1u8; 32]);
        assert!(!validate_work(&root, 42, 0));
    }

    #[test]
    fn max_threshold_always_validates() {
        let root = Root::from_bytes([1u8; 32]);
        assert!(validate_work(&root, 42, u64::MAX));
    }
}
