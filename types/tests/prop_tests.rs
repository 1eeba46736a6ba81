use proptest::prelude::*;

use kestrel_types::{Account, Amount, BlockHash, Epoch, Root, Timestamp};

proptest! {
    /// Account roundtrip: from_bytes -> as_bytes is the identity.
    #[test]
    fn account_bytes_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let account = Account::from_bytes(bytes);
        prop_assert_eq!(account.as_bytes(), &bytes);
    }

    /// Account hex encode/decode roundtrip.
    #[test]
    fn account_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let account = Account::from_bytes(bytes);
        let decoded = Account::decode_hex(&account.encode_hex()).unwrap();
        prop_assert_eq!(decoded, account);
    }

    /// BlockHash::is_zero is true only for all-zero bytes.
    #[test]
    fn block_hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::from_bytes(bytes);
        prop_assert_eq!(hash.is_zero(), bytes == [0u8; 32]);
    }

    /// BlockHash bincode serialization roundtrip.
    #[test]
    fn block_hash_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::from_bytes(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: BlockHash = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, hash);
    }

    /// Root built from a hash equals one built from an account with the same bytes.
    #[test]
    fn root_ignores_provenance(bytes in prop::array::uniform32(0u8..)) {
        let from_hash = Root::from(BlockHash::from_bytes(bytes));
        let from_account = Root::from(Account::from_bytes(bytes));
        prop_assert_eq!(from_hash, from_account);
    }

    /// Amount big-endian and little-endian encodings roundtrip.
    #[test]
    fn amount_endian_roundtrip(raw in any::<u128>()) {
        let amount = Amount::raw(raw);
        prop_assert_eq!(Amount::from_be_bytes(amount.to_be_bytes()), amount);
        prop_assert_eq!(Amount::from_le_bytes(amount.to_le_bytes()), amount);
    }

    /// Amount checked_sub returns None exactly when it would underflow.
    #[test]
    fn amount_checked_sub(a in any::<u128>(), b in any::<u128>()) {
        let result = Amount::raw(a).checked_sub(Amount::raw(b));
        if b > a {
            prop_assert!(result.is_none());
        } else {
            prop_assert_eq!(result, Some(Amount::raw(a - b)));
        }
    }

    /// Account successor is the 256-bit increment.
    #[test]
    fn account_successor_orders(bytes in prop::array::uniform32(0u8..)) {
        let account = Account::from_bytes(bytes);
        let next = account.successor();
        if bytes != [0xFF; 32] {
            prop_assert!(next > account);
        } else {
            prop_assert!(next.is_zero());
        }
    }

    /// Epoch as_u8/from_u8 roundtrip.
    #[test]
    fn epoch_u8_roundtrip(tag in 0u8..3) {
        let epoch = Epoch::from_u8(tag).unwrap();
        prop_assert_eq!(epoch.as_u8(), tag);
    }

    /// Timestamp ordering matches the underlying seconds.
    #[test]
    fn timestamp_ordering(a in any::<u64>(), b in any::<u64>()) {
        prop_assert_eq!(Timestamp::new(a) <= Timestamp::new(b), a <= b);
    }
}
