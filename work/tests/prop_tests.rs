use proptest::prelude::*;

use kestrel_types::Root;
use kestrel_work::{validate_work, work_value};

proptest! {
    /// The work digest is a pure function of (root, work).
    #[test]
    fn work_value_deterministic(bytes in prop::array::uniform32(0u8..), work in any::<u64>()) {
        let root = Root::from_bytes(bytes);
        prop_assert_eq!(work_value(&root, work), work_value(&root, work));
    }

    /// Validation is monotone in the threshold: loosening never invalidates.
    #[test]
    fn validate_monotone_in_threshold(
        bytes in prop::array::uniform32(0u8..),
        work in any::<u64>(),
        t1 in any::<u64>(),
        t2 in any::<u64>(),
    ) {
        let root = Root::from_bytes(bytes);
        let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        if validate_work(&root, work, lo) {
            prop_assert!(validate_work(&root, work, hi));
        }
    }

    /// validate_work agrees with comparing the digest directly.
    #[test]
    fn validate_matches_digest(
        bytes in prop::array::uniform32(0u8..),
        work in any::<u64>(),
        threshold in any::<u64>(),
    ) {
        let root = Root::from_bytes(bytes);
        prop_assert_eq!(validate_work(&root, work, threshold), work_value(&root, work) < threshold);
    }
}
