//! Ed25519 key pairs.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use kestrel_types::{Account, RawKey};

/// An Ed25519 key pair. The public half is the account identifier.
#[derive(Clone)]
pub struct KeyPair {
    secret: RawKey,
    account: Account,
}

impl KeyPair {
    /// Generate a new random key pair from the system RNG.
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing)
    }

    /// Reconstruct a key pair from a secret key.
    pub fn from_raw_key(secret: RawKey) -> Self {
        let signing = SigningKey::from_bytes(secret.as_bytes());
        Self::from_signing_key(signing)
    }

    /// Deterministic key pair from 32 seed bytes. Used by dev genesis and tests.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_raw_key(RawKey::from_bytes(seed))
    }

    fn from_signing_key(signing: SigningKey) -> Self {
        let account = Account::from_bytes(signing.verifying_key().to_bytes());
        Self {
            secret: RawKey::from_bytes(signing.to_bytes()),
            account,
        }
    }

    /// The account (public key) for this key pair.
    pub fn account(&self) -> Account {
        self.account
    }

    pub fn secret(&self) -> &RawKey {
        &self.secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_deterministic() {
        let a = KeyPair::from_seed([7u8; 32]);
        let b = KeyPair::from_seed([7u8; 32]);
        assert_eq!(a.account(), b.account());
    }

    #[test]
    fn distinct_seeds_distinct_accounts() {
        let a = KeyPair::from_seed([1u8; 32]);
        let b = KeyPair::from_seed([2u8; 32]);
        assert_ne!(a.account(), b.account());
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(KeyPair::generate().account(), KeyPair::generate().account());
    }
}
